// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::sync::Arc;

use byteview::ByteView;
use futures::future::BoxFuture;
use lru_cache::LruCache;
use parking_lot::Mutex;
use uniflight::UniFlight;

use crate::{Context, Error, GetRequest, Group, NoPeers, PeerGetter, PeerPicker, PeerPickerRegistry};

/// Loads values this process owns from the source of truth.
pub trait Getter: Send + Sync {
    /// Produces the value for `key`.
    fn get<'a>(&'a self, ctx: &'a Context, key: &'a str) -> BoxFuture<'a, Result<ByteView, Error>>;
}

/// A [`Getter`] backed by an async closure; see [`getter_fn`].
pub struct GetterFn<F>(F);

/// Turns an async closure taking an owned context and key into a [`Getter`].
///
/// # Example
///
/// ```
/// use groupcache::{ByteView, getter_fn};
///
/// let getter = getter_fn(|_ctx, key: String| async move { Ok(ByteView::from(key.to_uppercase())) });
/// # let _ = getter;
/// ```
pub fn getter_fn<F, Fut>(func: F) -> GetterFn<F>
where
    F: Fn(Context, String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ByteView, Error>> + Send + 'static,
{
    GetterFn(func)
}

impl<F, Fut> Getter for GetterFn<F>
where
    F: Fn(Context, String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ByteView, Error>> + Send + 'static,
{
    fn get<'a>(&'a self, ctx: &'a Context, key: &'a str) -> BoxFuture<'a, Result<ByteView, Error>> {
        Box::pin((self.0)(ctx.clone(), key.to_owned()))
    }
}

impl<F> fmt::Debug for GetterFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetterFn").finish_non_exhaustive()
    }
}

/// A read-through cache group.
///
/// A lookup is answered from the local LRU when possible. On a miss, the key's owner is found
/// through the group's [`PeerPicker`]: a remote owner is asked over the wire, while keys owned by
/// this process (or keys whose owner failed to answer) are produced by the [`Getter`]. Concurrent
/// misses for the same key share a single load.
///
/// Only values loaded locally are cached here. Values fetched from a peer stay cached on that peer.
pub struct CacheGroup {
    name: String,
    getter: Box<dyn Getter>,
    peers: Arc<dyn PeerPicker>,
    cache: Mutex<LruCache<String, ByteView>>,
    peer_loads: UniFlight<String, Result<ByteView, Error>>,
    local_loads: UniFlight<String, Result<ByteView, Error>>,
}

impl CacheGroup {
    /// Starts building a group named `name` that loads values with `getter`.
    pub fn builder(name: impl Into<String>, getter: impl Getter + 'static) -> CacheGroupBuilder {
        CacheGroupBuilder {
            name: name.into(),
            getter: Box::new(getter),
            peers: None,
            cache_entries: 0,
        }
    }

    /// Number of values cached in this process.
    #[must_use]
    pub fn cached_entries(&self) -> usize {
        self.cache.lock().len()
    }

    /// Drops the cached value for `key`, if any.
    ///
    /// Only this process's cache is affected; peers keep their copies.
    pub fn forget(&self, key: &str) {
        self.cache.lock().take(key);
    }

    fn cached(&self, key: &str) -> Option<ByteView> {
        self.cache.lock().get(key).cloned()
    }

    async fn load_from_peer(&self, peer: Arc<dyn PeerGetter>, ctx: &Context, key: &str) -> Result<ByteView, Error> {
        let request = GetRequest::new(self.name.as_str(), key);
        match peer.fetch(ctx, &request).await {
            Ok(response) => Ok(ByteView::from(response.value)),
            Err(error) => {
                tracing::event!(
                    name: "groupcache.peer_fetch_failed",
                    tracing::Level::WARN,
                    group = %self.name,
                    key,
                    peer = ?peer,
                    %error,
                    "loading locally instead",
                );
                self.load_locally(ctx, key).await
            }
        }
    }

    async fn load_locally(&self, ctx: &Context, key: &str) -> Result<ByteView, Error> {
        if let Some(value) = self.cached(key) {
            return Ok(value);
        }

        self.local_loads
            .work(key.to_owned(), || self.load_from_getter(ctx, key))
            .await
    }

    async fn load_from_getter(&self, ctx: &Context, key: &str) -> Result<ByteView, Error> {
        // Another load may have finished between the cache check and joining the flight.
        if let Some(value) = self.cached(key) {
            return Ok(value);
        }

        let value = self.getter.get(ctx, key).await?;
        self.cache.lock().add(key.to_owned(), value.clone());
        Ok(value)
    }
}

impl Group for CacheGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn get<'a>(&'a self, ctx: &'a Context, key: &'a str) -> BoxFuture<'a, Result<ByteView, Error>> {
        Box::pin(async move {
            if let Some(value) = self.cached(key) {
                return Ok(value);
            }

            match self.peers.pick_peer(key) {
                Some(peer) => {
                    self.peer_loads
                        .work(key.to_owned(), || self.load_from_peer(peer, ctx, key))
                        .await
                }
                None => self.load_locally(ctx, key).await,
            }
        })
    }

    fn local_get<'a>(&'a self, ctx: &'a Context, key: &'a str) -> BoxFuture<'a, Result<ByteView, Error>> {
        Box::pin(self.load_locally(ctx, key))
    }
}

impl fmt::Debug for CacheGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheGroup")
            .field("name", &self.name)
            .field("peers", &self.peers)
            .field("cache", &*self.cache.lock())
            .finish_non_exhaustive()
    }
}

/// Builder for [`CacheGroup`].
pub struct CacheGroupBuilder {
    name: String,
    getter: Box<dyn Getter>,
    peers: Option<Arc<dyn PeerPicker>>,
    cache_entries: usize,
}

impl CacheGroupBuilder {
    /// Caps the number of locally cached values. Zero, the default, means unbounded.
    #[must_use]
    pub fn cache_entries(mut self, max_entries: usize) -> Self {
        self.cache_entries = max_entries;
        self
    }

    /// Uses `peers` to locate the owners of keys.
    #[must_use]
    pub fn peers(mut self, peers: Arc<dyn PeerPicker>) -> Self {
        self.peers = Some(peers);
        self
    }

    /// Uses whatever picker `registry` holds for this group's name.
    #[must_use]
    pub fn peers_from(mut self, registry: &PeerPickerRegistry) -> Self {
        self.peers = Some(registry.picker_for(&self.name));
        self
    }

    /// Creates the group. Without a configured picker, every key is loaded locally.
    #[must_use]
    pub fn build(self) -> Arc<CacheGroup> {
        Arc::new(CacheGroup {
            name: self.name,
            getter: self.getter,
            peers: self.peers.unwrap_or_else(|| Arc::new(NoPeers)),
            cache: Mutex::new(LruCache::new(self.cache_entries)),
            peer_loads: UniFlight::new(),
            local_loads: UniFlight::new(),
        })
    }
}

impl fmt::Debug for CacheGroupBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheGroupBuilder")
            .field("name", &self.name)
            .field("cache_entries", &self.cache_entries)
            .finish_non_exhaustive()
    }
}
