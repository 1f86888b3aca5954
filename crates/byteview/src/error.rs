// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// An error returned by the positional read and write operations of a [`ByteView`][crate::ByteView].
///
/// Indexing and slicing outside the bounds of a view are programming errors and panic instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ByteViewError {
    /// The caller asked to read from a negative offset.
    #[error("byte view: invalid offset {offset}")]
    OutOfRange {
        /// The rejected offset.
        offset: i64,
    },

    /// Fewer bytes than requested remained in the view.
    ///
    /// `read` bytes were still copied into the destination buffer before the end was reached.
    #[error("byte view: end of data after {read} bytes")]
    EndOfData {
        /// How many bytes were copied before the end of the view.
        read: usize,
    },

    /// The sink accepted fewer bytes than the view holds without reporting an error itself.
    #[error("byte view: short write ({written} of {expected} bytes)")]
    ShortWrite {
        /// How many bytes the sink accepted.
        written: usize,
        /// How many bytes the view tried to write.
        expected: usize,
    },

    /// The sink reported an I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
