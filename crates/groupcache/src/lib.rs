// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A distributed read-through cache.
//!
//! Each process holds a share of the cached values. Keys are assigned to processes ("peers") by
//! consistent hashing, so every key has exactly one owner. A lookup for a key owned by another
//! peer is forwarded to it over HTTP; a lookup for a key the process owns is served from its local
//! LRU or, on a miss, loaded once from the source of truth no matter how many callers asked for it.
//!
//! # Pieces
//!
//! - [`Group`] is a named namespace of values, and [`GroupRegistry`] finds groups by name.
//!   [`CacheGroup`] is the read-through implementation, loading values with a [`Getter`].
//! - [`PeerPicker`] maps keys to the [`PeerGetter`] of their owner. [`HttpPool`] is the HTTP
//!   implementation and also serves other peers. [`PeerPickerRegistry`] hands the picker to groups.
//! - [`GetRequest`] and [`GetResponse`] are the messages exchanged between peers.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use groupcache::{ByteView, CacheGroup, Context, Group, GroupRegistry, HttpPool, getter_fn};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let groups = Arc::new(GroupRegistry::new());
//! let pool = Arc::new(HttpPool::new("http://10.0.0.1:8000", Arc::clone(&groups)));
//! pool.set_peers(["http://10.0.0.1:8000", "http://10.0.0.2:8000"]);
//!
//! let thumbnails = CacheGroup::builder("thumbnails", getter_fn(|_ctx, key: String| async move {
//!     Ok(ByteView::from(format!("thumbnail of {key}")))
//! }))
//! .cache_entries(10_000)
//! .peers(pool.clone())
//! .build();
//! groups.register(thumbnails.clone())?;
//!
//! let listener = tokio::net::TcpListener::bind("10.0.0.1:8000").await?;
//! tokio::spawn(Arc::clone(&pool).serve(listener));
//!
//! let value = thumbnails.get(&Context::new(), "cat.png").await?;
//! # let _ = value;
//! # Ok(())
//! # }
//! ```

mod cache_group;
mod context;
mod error;
mod group;
mod peers;
mod pool;
pub mod proto;

#[cfg(test)]
mod testing;

pub use byteview::ByteView;
pub use cache_group::{CacheGroup, CacheGroupBuilder, Getter, GetterFn, getter_fn};
pub use context::Context;
pub use error::{BoxError, Error, SharedError};
pub use futures::future::BoxFuture;
pub use group::{Group, GroupRegistry};
pub use peers::{NoPeers, PeerGetter, PeerPicker, PeerPickerRegistry};
pub use pool::{
    ContextFn, DEFAULT_BASE_PATH, DEFAULT_MAX_RESPONSE_BYTES, HttpPool, HttpPoolOptions, HyperTransport, ResponseBody,
    Transport, TransportFn,
};
pub use proto::{GetRequest, GetResponse};
