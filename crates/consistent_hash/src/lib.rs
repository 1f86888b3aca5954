// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Consistent hashing of keys onto a set of peers.
//!
//! [`HashRing`] places every peer on a 32-bit ring several times ("virtual replicas") to even out
//! the share of keys each one owns. Looking up a key is a binary search over the sorted points.
//!
//! # Example
//!
//! ```
//! use consistent_hash::{DEFAULT_REPLICAS, HashRing};
//!
//! let mut ring = HashRing::new(DEFAULT_REPLICAS);
//! ring.add(["http://10.0.0.1:8000", "http://10.0.0.2:8000"]);
//!
//! let owner = ring.get("images/cat.png").expect("ring has peers");
//! assert!(owner.starts_with("http://10.0.0."));
//! ```

mod ring;

pub use ring::{DEFAULT_REPLICAS, HashFn, HashRing, crc32};
