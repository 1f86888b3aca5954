// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Messages exchanged between peers.
//!
//! Messages are encoded with `postcard`. Decoding is strict: a body with bytes left over after the
//! message is rejected rather than silently truncated.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::Error;

/// `Content-Type` of encoded messages.
pub const CONTENT_TYPE: &str = "application/x-groupcache-postcard";

/// Asks a peer for the value of `key` in `group`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GetRequest {
    /// Name of the group.
    pub group: String,
    /// The key to look up.
    pub key: String,
}

impl GetRequest {
    /// Creates a request for `key` in `group`.
    pub fn new(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            key: key.into(),
        }
    }
}

/// A peer's answer to a [`GetRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetResponse {
    /// The cached value.
    pub value: Bytes,
}

impl GetResponse {
    /// Encodes the response for the wire.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        encode(self)
    }

    /// Decodes a response body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if `body` is not exactly one encoded response.
    pub fn decode(body: &[u8]) -> Result<Self, Error> {
        decode(body)
    }
}

fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, Error> {
    postcard::to_allocvec(message).map_err(Error::encode)
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    let (message, rest) = postcard::take_from_bytes(body).map_err(Error::decode)?;
    if !rest.is_empty() {
        return Err(Error::decode(format!("{} trailing bytes after message", rest.len())));
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_survives_the_wire() {
        let response = GetResponse {
            value: Bytes::from_static(b"\x00\xffcat pixels"),
        };
        let body = response.encode().expect("encodes");
        assert_eq!(GetResponse::decode(&body).expect("decodes"), response);
    }

    #[test]
    fn empty_value() {
        let body = GetResponse::default().encode().expect("encodes");
        assert_eq!(GetResponse::decode(&body).expect("decodes").value, Bytes::new());
    }

    #[test]
    fn request_survives_the_wire() {
        let request = GetRequest::new("images", "cat.png");
        let body = encode(&request).expect("encodes");
        assert_eq!(decode::<GetRequest>(&body).expect("decodes"), request);
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut body = GetResponse {
            value: Bytes::from_static(b"v"),
        }
        .encode()
        .expect("encodes");
        body.push(0);

        let error = GetResponse::decode(&body).expect_err("trailing byte");
        assert!(matches!(error, Error::Decode(_)));
        assert!(error.to_string().contains("1 trailing bytes"));
    }

    #[test]
    fn serialization_failure_is_encode_error() {
        struct Unencodable;

        impl Serialize for Unencodable {
            fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("value cannot be encoded"))
            }
        }

        let error = encode(&Unencodable).expect_err("serializer refused");
        assert!(matches!(error, Error::Encode(_)), "{error:?}");
        assert!(error.to_string().starts_with("encoding message"));
    }

    #[test]
    fn truncated_body_rejected() {
        // Announces a 100 byte value but carries none of it.
        let error = GetResponse::decode(&[100]).expect_err("truncated");
        assert!(matches!(error, Error::Decode(_)));
    }
}
