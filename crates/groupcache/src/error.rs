// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use http::StatusCode;

/// A boxed error as produced by transports and response bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A shareable error, so one failure can be handed to every caller waiting on the same load.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while locating, fetching or loading cached values.
///
/// The type is cheap to clone: a failed load is delivered to every caller that joined it.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No group with the given name is registered.
    #[error("no such group: {0}")]
    GroupNotFound(String),

    /// A group with the given name is already registered.
    #[error("group {0:?} is already registered")]
    DuplicateGroup(String),

    /// The request to a peer could not be sent or its response could not be read.
    #[error(transparent)]
    Transport(SharedError),

    /// A peer answered with a status other than `200 OK`.
    #[error("server returned: {status}{}", detail(.message))]
    Remote {
        /// The status the peer answered with.
        status: StatusCode,
        /// The start of the peer's error text; empty when it sent none.
        message: String,
    },

    /// A message could not be encoded for the wire.
    #[error("encoding message: {0}")]
    Encode(SharedError),

    /// A peer's response body was too large or not a valid message.
    #[error("decoding response body: {0}")]
    Decode(SharedError),

    /// The local loader failed to produce a value.
    #[error("loading value: {0}")]
    Load(SharedError),

    /// A peer picker was registered a second time.
    #[error("a peer picker is already registered")]
    AlreadyRegistered,

    /// The HTTP server received a request outside of its base path.
    #[error("serving unexpected path: {path}")]
    UnexpectedPath {
        /// The path that was requested.
        path: String,
    },
}

impl Error {
    /// Wraps a transport failure, keeping its message verbatim.
    pub fn transport(source: impl Into<BoxError>) -> Self {
        Self::Transport(Arc::from(source.into()))
    }

    /// Wraps a failure to encode a message.
    pub fn encode(source: impl Into<BoxError>) -> Self {
        Self::Encode(Arc::from(source.into()))
    }

    /// Wraps a failure to decode a peer's response.
    pub fn decode(source: impl Into<BoxError>) -> Self {
        Self::Decode(Arc::from(source.into()))
    }

    /// Wraps a failure reported by a local loader.
    pub fn load(source: impl Into<BoxError>) -> Self {
        Self::Load(Arc::from(source.into()))
    }
}

fn detail(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {message}")
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use static_assertions::assert_impl_all;

    use super::*;

    #[test]
    fn thread_safe_type() {
        assert_impl_all!(Error: Send, Sync, Clone, std::error::Error);
    }

    #[test]
    fn transport_error_is_verbatim() {
        let error = Error::transport(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"));
        assert_eq!(error.to_string(), "connection refused");
    }

    #[test]
    fn remote_error_names_status() {
        let error = Error::Remote {
            status: StatusCode::NOT_FOUND,
            message: String::new(),
        };
        assert_eq!(error.to_string(), "server returned: 404 Not Found");
    }

    #[test]
    fn remote_error_carries_peer_text() {
        let error = Error::Remote {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "loading value: db down".into(),
        };
        assert_eq!(error.to_string(), "server returned: 500 Internal Server Error: loading value: db down");
    }

    #[test]
    fn messages() {
        assert_eq!(Error::GroupNotFound("images".into()).to_string(), "no such group: images");
        assert_eq!(Error::load("db down").to_string(), "loading value: db down");
        assert_eq!(Error::decode("truncated").to_string(), "decoding response body: truncated");
        assert_eq!(Error::encode("too deep").to_string(), "encoding message: too deep");
        assert_eq!(
            Error::UnexpectedPath { path: "/x".into() }.to_string(),
            "serving unexpected path: /x"
        );
    }

    #[test]
    fn clones_share_source() {
        let error = Error::load("db down");
        let clone = error.clone();

        match (error, clone) {
            (Error::Load(a), Error::Load(b)) => assert!(Arc::ptr_eq(&a, &b)),
            other => panic!("unexpected variants: {other:?}"),
        }
    }
}
