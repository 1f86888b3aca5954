// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crc::{CRC_32_ISO_HDLC, Crc};

/// Number of points each peer occupies on the ring unless configured otherwise.
pub const DEFAULT_REPLICAS: usize = 50;

/// A function mapping bytes onto the 32-bit ring.
pub type HashFn = Arc<dyn Fn(&[u8]) -> u32 + Send + Sync>;

const CRC32_IEEE: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// The default ring hash: the IEEE CRC-32 checksum of the input.
#[must_use]
pub fn crc32(data: &[u8]) -> u32 {
    CRC32_IEEE.checksum(data)
}

/// Maps keys to peers using consistent hashing.
///
/// Each peer occupies `replicas` virtual points on a 32-bit ring. A key belongs to the peer owning
/// the first point at or after the key's own hash, wrapping around to the lowest point. Adding or
/// removing one peer therefore moves only the keys adjacent to that peer's points.
///
/// A ring is meant to be built once per membership change: create a new one and [`add`][Self::add]
/// the complete peer set rather than mutating a ring that is already serving lookups.
#[derive(Clone)]
pub struct HashRing {
    hash: HashFn,
    replicas: usize,
    /// Virtual points, always sorted.
    points: Vec<u32>,
    owners: HashMap<u32, String>,
}

impl HashRing {
    /// Creates an empty ring using [`crc32`] as hash function.
    ///
    /// A `replicas` count of zero falls back to [`DEFAULT_REPLICAS`].
    #[must_use]
    pub fn new(replicas: usize) -> Self {
        Self::with_hash(replicas, Arc::new(crc32))
    }

    /// Creates an empty ring with a custom hash function.
    ///
    /// A `replicas` count of zero falls back to [`DEFAULT_REPLICAS`].
    #[must_use]
    pub fn with_hash(replicas: usize, hash: HashFn) -> Self {
        Self {
            hash,
            replicas: if replicas == 0 { DEFAULT_REPLICAS } else { replicas },
            points: Vec::new(),
            owners: HashMap::new(),
        }
    }

    /// Number of virtual points per peer.
    #[must_use]
    pub const fn replicas(&self) -> usize {
        self.replicas
    }

    /// Whether no peer has been added yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of distinct virtual points on the ring.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Places every peer on the ring.
    ///
    /// Peer `p` occupies the points `hash("{i}{p}")` for `i` in `0..replicas`. When two peers hash
    /// to the same point, the peer added last owns it.
    pub fn add<I>(&mut self, peers: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for peer in peers {
            let peer = peer.as_ref();
            for i in 0..self.replicas {
                let point = (self.hash)(format!("{i}{peer}").as_bytes());
                self.points.push(point);
                self.owners.insert(point, peer.to_owned());
            }
        }

        self.points.sort_unstable();
        self.points.dedup();
    }

    /// Returns the peer owning `key`, or `None` if the ring is empty.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.points.is_empty() {
            return None;
        }

        let hash = (self.hash)(key.as_bytes());
        let idx = self.points.partition_point(|&point| point < hash);
        let point = self.points.get(idx).unwrap_or(&self.points[0]);

        self.owners.get(point).map(String::as_str)
    }
}

impl fmt::Debug for HashRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRing")
            .field("replicas", &self.replicas)
            .field("points", &self.points.len())
            .finish_non_exhaustive()
    }
}
