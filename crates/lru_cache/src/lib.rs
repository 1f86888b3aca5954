// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A bounded least-recently-used cache with an eviction callback.
//!
//! [`LruCache`] keeps at most `max_entries` entries and drops the least recently used one when a new
//! key would exceed that bound. Entries are promoted on every [`add`][LruCache::add] and
//! [`get`][LruCache::get]. An optional callback observes every entry that is evicted, including
//! those discarded by [`clear`][LruCache::clear], which makes it a convenient hook for statistics.
//!
//! The cache is a plain data structure: it performs no locking and expects its owner to
//! serialize access.
//!
//! # Example
//!
//! ```
//! use lru_cache::LruCache;
//!
//! let mut cache = LruCache::new(2).with_eviction_callback(|key: String, _value: u32| {
//!     println!("evicted {key}");
//! });
//!
//! cache.add("a".to_string(), 1);
//! cache.add("b".to_string(), 2);
//! cache.get("a");
//! cache.add("c".to_string(), 3); // evicts "b"
//!
//! assert!(cache.contains("a"));
//! assert!(!cache.contains("b"));
//! ```

mod cache;
mod list;

pub use cache::{EvictionCallback, LruCache};
pub use list::Iter;
