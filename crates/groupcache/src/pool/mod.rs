// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Peers talking to each other over HTTP.

mod buffer_pool;
mod client;
mod options;
mod server;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use client::{HyperTransport, ResponseBody, Transport};
use consistent_hash::HashRing;
pub use options::{ContextFn, DEFAULT_BASE_PATH, DEFAULT_MAX_RESPONSE_BYTES, HttpPoolOptions, TransportFn};
use parking_lot::Mutex;

use self::buffer_pool::BufferPool;
use self::client::HttpGetter;
use crate::{Context, GroupRegistry, PeerGetter, PeerPicker};

/// A set of peers sharing groups over HTTP.
///
/// The pool is both sides of the conversation: as a [`PeerPicker`] it maps keys to the peers that
/// own them and fetches from them, and as a server ([`handle`][Self::handle],
/// [`serve`][Self::serve]) it answers other peers from the local [`GroupRegistry`].
///
/// Peers are identified by their base URL, such as `http://10.0.0.1:8000`, and the pool must be
/// told which of them is itself so it never sends requests to itself.
pub struct HttpPool {
    self_url: String,
    options: HttpPoolOptions,
    transport: TransportFn,
    groups: Arc<GroupRegistry>,
    buffers: Arc<BufferPool>,
    peers: Mutex<PeerTable>,
}

struct PeerTable {
    ring: HashRing,
    getters: HashMap<String, Arc<HttpGetter>>,
}

impl HttpPool {
    /// Creates a pool with default options for the peer reachable at `self_url`.
    #[must_use]
    pub fn new(self_url: impl Into<String>, groups: Arc<GroupRegistry>) -> Self {
        Self::with_options(self_url, groups, HttpPoolOptions::default())
    }

    /// Creates a pool for the peer reachable at `self_url`.
    #[must_use]
    pub fn with_options(self_url: impl Into<String>, groups: Arc<GroupRegistry>, options: HttpPoolOptions) -> Self {
        let transport = options.transport.clone().unwrap_or_else(|| -> TransportFn {
            let shared: Arc<dyn Transport> = Arc::new(HyperTransport::new());
            Arc::new(move |_: &Context| Arc::clone(&shared))
        });

        let peers = PeerTable {
            ring: new_ring(&options),
            getters: HashMap::new(),
        };

        Self {
            self_url: self_url.into(),
            options,
            transport,
            groups,
            buffers: Arc::default(),
            peers: Mutex::new(peers),
        }
    }

    /// The URL this process is reachable at.
    #[must_use]
    pub fn self_url(&self) -> &str {
        &self.self_url
    }

    /// The options the pool was created with.
    #[must_use]
    pub fn options(&self) -> &HttpPoolOptions {
        &self.options
    }

    /// The groups served to other peers.
    #[must_use]
    pub fn groups(&self) -> &Arc<GroupRegistry> {
        &self.groups
    }

    /// Replaces the set of peers. The list should include this process's own URL.
    pub fn set_peers<I>(&self, peers: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let peers: Vec<String> = peers.into_iter().map(|peer| peer.as_ref().to_owned()).collect();

        let mut ring = new_ring(&self.options);
        ring.add(&peers);

        let getters = peers
            .iter()
            .map(|peer| {
                let getter = HttpGetter::new(
                    format!("{peer}{}", self.options.base_path()),
                    Arc::clone(&self.transport),
                    self.options.max_response_bytes(),
                    Arc::clone(&self.buffers),
                );
                (peer.clone(), Arc::new(getter))
            })
            .collect();

        *self.peers.lock() = PeerTable { ring, getters };

        tracing::event!(
            name: "groupcache.peers_set",
            tracing::Level::INFO,
            self_url = %self.self_url,
            peers = ?peers,
        );
    }
}

fn new_ring(options: &HttpPoolOptions) -> HashRing {
    match options.hash_fn() {
        Some(hash_fn) => HashRing::with_hash(options.replicas(), Arc::clone(hash_fn)),
        None => HashRing::new(options.replicas()),
    }
}

impl PeerPicker for HttpPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let peers = self.peers.lock();
        let owner = peers.ring.get(key)?;
        if owner == self.self_url {
            return None;
        }

        peers
            .getters
            .get(owner)
            .map(|getter| Arc::clone(getter) as Arc<dyn PeerGetter>)
    }
}

impl fmt::Debug for HttpPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let peers = self.peers.lock();
        f.debug_struct("HttpPool")
            .field("self_url", &self.self_url)
            .field("options", &self.options)
            .field("peers", &peers.getters.len())
            .finish_non_exhaustive()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::testing::LogCapture;

    const SELF: &str = "http://10.0.0.1:8000";
    const OTHER: &str = "http://10.0.0.2:8000";

    fn pool() -> HttpPool {
        HttpPool::new(SELF, Arc::default())
    }

    #[test]
    fn thread_safe_type() {
        assert_impl_all!(HttpPool: Send, Sync, PeerPicker);
    }

    #[test]
    fn no_peers_means_local() {
        assert!(pool().pick_peer("anything").is_none());
    }

    #[test]
    fn only_self_means_local() {
        let pool = pool();
        pool.set_peers([SELF]);
        for i in 0..100 {
            assert!(pool.pick_peer(&format!("key-{i}")).is_none());
        }
    }

    #[test]
    fn only_other_means_remote() {
        let pool = pool();
        pool.set_peers([OTHER]);

        let peer = pool.pick_peer("cat.png").expect("remote owner");
        assert!(format!("{peer:?}").contains("http://10.0.0.2:8000/_groupcache/"));
    }

    #[test]
    fn keys_split_between_self_and_other() {
        let pool = pool();
        pool.set_peers([SELF, OTHER]);

        let remote = (0..1000).filter(|i| pool.pick_peer(&format!("key-{i}")).is_some()).count();
        assert!(remote > 100 && remote < 900, "{remote} of 1000 keys remote");
    }

    #[test]
    fn set_peers_replaces_previous_set() {
        let pool = pool();
        pool.set_peers([OTHER]);
        pool.set_peers([SELF]);

        assert!(pool.pick_peer("cat.png").is_none());
        assert!(format!("{pool:?}").contains("peers: 1"));
    }

    #[test]
    fn custom_hash_fn_is_used() {
        // Every point and key lands on 0, so the last peer added owns everything.
        let options = HttpPoolOptions::default().with_hash_fn(Arc::new(|_: &[u8]| 0_u32));
        let pool = HttpPool::with_options(SELF, Arc::default(), options);
        pool.set_peers([SELF, OTHER]);

        assert!(pool.pick_peer("a").is_some());
        assert!(pool.pick_peer("b").is_some());
    }

    #[test]
    fn set_peers_is_logged() {
        use tracing_subscriber::util::SubscriberInitExt;

        let logs = LogCapture::new();
        let _guard = logs.subscriber().set_default();

        pool().set_peers([SELF, OTHER]);

        logs.assert_contains("INFO");
        logs.assert_contains("http://10.0.0.2:8000");
    }
}
