// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::sync::Arc;

use consistent_hash::{DEFAULT_REPLICAS, HashFn};

use super::Transport;
use crate::Context;

/// Path prefix under which peers serve each other.
pub const DEFAULT_BASE_PATH: &str = "/_groupcache/";

/// Largest response body accepted from a peer unless configured otherwise.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;

/// Chooses the transport for an outgoing request from the caller's context.
pub type TransportFn = Arc<dyn Fn(&Context) -> Arc<dyn Transport> + Send + Sync>;

/// Builds the context a served request is looked up with.
pub type ContextFn = Arc<dyn Fn(&http::request::Parts) -> Context + Send + Sync>;

/// Configuration of an [`HttpPool`](super::HttpPool).
///
/// # Example
///
/// ```
/// use groupcache::HttpPoolOptions;
///
/// let options = HttpPoolOptions::default()
///     .with_base_path("/cache/")
///     .with_replicas(100);
/// assert_eq!(options.base_path(), "/cache/");
/// ```
#[derive(Clone)]
pub struct HttpPoolOptions {
    base_path: String,
    replicas: usize,
    hash_fn: Option<HashFn>,
    max_response_bytes: usize,
    pub(super) transport: Option<TransportFn>,
    pub(super) context: Option<ContextFn>,
}

impl Default for HttpPoolOptions {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_owned(),
            replicas: DEFAULT_REPLICAS,
            hash_fn: None,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            transport: None,
            context: None,
        }
    }
}

impl HttpPoolOptions {
    /// Sets the path prefix peers are served under. An empty path restores the default.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        let base_path = base_path.into();
        self.base_path = if base_path.is_empty() {
            DEFAULT_BASE_PATH.to_owned()
        } else {
            base_path
        };
        self
    }

    /// Sets how many points each peer occupies on the hash ring. Zero restores the default.
    #[must_use]
    pub fn with_replicas(mut self, replicas: usize) -> Self {
        self.replicas = if replicas == 0 { DEFAULT_REPLICAS } else { replicas };
        self
    }

    /// Replaces the ring's CRC-32 hash.
    #[must_use]
    pub fn with_hash_fn(mut self, hash_fn: HashFn) -> Self {
        self.hash_fn = Some(hash_fn);
        self
    }

    /// Caps the size of response bodies accepted from peers.
    #[must_use]
    pub fn with_max_response_bytes(mut self, max_response_bytes: usize) -> Self {
        self.max_response_bytes = max_response_bytes;
        self
    }

    /// Uses one transport for every outgoing request.
    #[must_use]
    pub fn with_transport(self, transport: Arc<dyn Transport>) -> Self {
        self.with_transport_fn(move |_| Arc::clone(&transport))
    }

    /// Chooses the transport per request from the caller's context.
    #[must_use]
    pub fn with_transport_fn<F>(mut self, select: F) -> Self
    where
        F: Fn(&Context) -> Arc<dyn Transport> + Send + Sync + 'static,
    {
        self.transport = Some(Arc::new(select));
        self
    }

    /// Builds the context for served requests from the request head.
    #[must_use]
    pub fn with_context_fn<F>(mut self, extract: F) -> Self
    where
        F: Fn(&http::request::Parts) -> Context + Send + Sync + 'static,
    {
        self.context = Some(Arc::new(extract));
        self
    }

    /// The path prefix peers are served under.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Points per peer on the hash ring.
    #[must_use]
    pub const fn replicas(&self) -> usize {
        self.replicas
    }

    /// The custom ring hash, if one was set.
    #[must_use]
    pub fn hash_fn(&self) -> Option<&HashFn> {
        self.hash_fn.as_ref()
    }

    /// The cap on response bodies accepted from peers.
    #[must_use]
    pub const fn max_response_bytes(&self) -> usize {
        self.max_response_bytes
    }
}

impl fmt::Debug for HttpPoolOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPoolOptions")
            .field("base_path", &self.base_path)
            .field("replicas", &self.replicas)
            .field("custom_hash_fn", &self.hash_fn.is_some())
            .field("max_response_bytes", &self.max_response_bytes)
            .field("custom_transport", &self.transport.is_some())
            .field("custom_context", &self.context.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = HttpPoolOptions::default();
        assert_eq!(options.base_path(), "/_groupcache/");
        assert_eq!(options.replicas(), 50);
        assert!(options.hash_fn().is_none());
        assert_eq!(options.max_response_bytes(), 64 * 1024 * 1024);
    }

    #[test]
    fn empty_and_zero_restore_defaults() {
        let options = HttpPoolOptions::default()
            .with_base_path("/x/")
            .with_replicas(3)
            .with_base_path("")
            .with_replicas(0);

        assert_eq!(options.base_path(), DEFAULT_BASE_PATH);
        assert_eq!(options.replicas(), DEFAULT_REPLICAS);
    }

    #[test]
    fn debug_hides_closures() {
        let options = HttpPoolOptions::default().with_context_fn(|_| Context::new());
        let debug = format!("{options:?}");
        assert!(debug.contains("custom_context: true"));
        assert!(debug.contains("custom_transport: false"));
    }
}
