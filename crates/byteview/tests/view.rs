// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `ByteView` as seen by a cache consumer.

use byteview::{ByteView, ByteViewError};

fn sample() -> Vec<u8> {
    (0..=255_u8).cycle().take(1000).collect()
}

#[test]
fn every_byte_and_every_slice_matches_input() {
    let input = sample();
    let view = ByteView::from(input.clone());

    for (i, byte) in input.iter().enumerate() {
        assert_eq!(view.at(i), *byte);
    }

    for (from, to) in [(0, 0), (0, 1000), (10, 20), (999, 1000), (500, 750)] {
        let sliced = view.slice(from, to);
        assert_eq!(sliced.len(), to - from);
        assert_eq!(sliced, &input[from..to]);
    }
}

#[test]
fn clones_and_copies_never_affect_the_cached_value() {
    let cached = ByteView::from("cached value");
    let handed_out = cached.clone();

    let mut copy = handed_out.to_vec();
    copy.iter_mut().for_each(|b| *b = b'x');

    assert_eq!(cached, "cached value");
    assert_eq!(handed_out, cached);
}

#[test]
fn read_at_walks_the_view_in_chunks() {
    let view = ByteView::from("abcdefghij");
    let mut collected = Vec::new();
    let mut offset = 0_i64;
    let mut chunk = [0_u8; 4];

    loop {
        match view.read_at(&mut chunk, offset) {
            Ok(read) => {
                collected.extend_from_slice(&chunk[..read]);
                offset += i64::try_from(read).expect("chunk size fits in i64");
            }
            Err(ByteViewError::EndOfData { read }) => {
                collected.extend_from_slice(&chunk[..read]);
                break;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(collected, b"abcdefghij");
}
