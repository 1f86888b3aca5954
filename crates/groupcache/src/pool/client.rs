// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Request, Response, StatusCode};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, LengthLimitError, Limited};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use pct_str::{PctString, UriReserved};

use super::buffer_pool::BufferPool;
use super::options::TransportFn;
use crate::error::BoxError;
use crate::{Context, Error, GetRequest, GetResponse, PeerGetter};

/// Most bytes of a peer's error text kept in [`Error::Remote`].
const MAX_ERROR_DETAIL: usize = 256;

/// Body of a response handed back by a [`Transport`].
pub type ResponseBody = UnsyncBoxBody<Bytes, BoxError>;

/// Sends a single HTTP request to a peer.
///
/// The default implementation is [`HyperTransport`]. Custom transports can add authentication,
/// route through proxies or stand in for the network in tests.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends `request` and returns the response head with a streaming body.
    fn round_trip(&self, request: Request<Empty<Bytes>>) -> BoxFuture<'_, Result<Response<ResponseBody>, BoxError>>;
}

/// A [`Transport`] backed by a pooled hyper HTTP/1 client.
#[derive(Debug, Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Empty<Bytes>>,
}

impl HyperTransport {
    /// Creates a client that spawns its connection tasks on the current tokio runtime.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    fn round_trip(&self, request: Request<Empty<Bytes>>) -> BoxFuture<'_, Result<Response<ResponseBody>, BoxError>> {
        let response = self.client.request(request);
        Box::pin(async move {
            let response = response.await.map_err(BoxError::from)?;
            Ok::<_, BoxError>(response.map(|body| body.map_err(BoxError::from).boxed_unsync()))
        })
    }
}

/// Fetches values from one peer over HTTP.
pub(crate) struct HttpGetter {
    /// Peer URL followed by the base path, e.g. `http://10.0.0.2:8000/_groupcache/`.
    base_url: String,
    transport: TransportFn,
    max_response_bytes: usize,
    buffers: Arc<BufferPool>,
}

impl HttpGetter {
    pub(crate) fn new(base_url: String, transport: TransportFn, max_response_bytes: usize, buffers: Arc<BufferPool>) -> Self {
        Self {
            base_url,
            transport,
            max_response_bytes,
            buffers,
        }
    }

    fn url_for(&self, request: &GetRequest) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            PctString::encode(request.group.chars(), UriReserved::Any),
            PctString::encode(request.key.chars(), UriReserved::Any),
        )
    }

    async fn get(&self, ctx: &Context, request: &GetRequest) -> Result<GetResponse, Error> {
        let http_request = Request::get(self.url_for(request))
            .body(Empty::new())
            .map_err(Error::transport)?;

        let transport = (self.transport)(ctx);
        let response = transport.round_trip(http_request).await.map_err(Error::transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            let message = error_detail(response.into_body()).await;
            return Err(Error::Remote { status, message });
        }

        let mut buffer = self.buffers.take();
        let mut body = Limited::new(response.into_body(), self.max_response_bytes);
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(classify_body_error)?;
            if let Some(data) = frame.data_ref() {
                buffer.extend_from_slice(data);
            }
        }

        GetResponse::decode(&buffer)
    }
}

/// Reads the start of an error body as text. A body that breaks off early yields what arrived.
async fn error_detail(mut body: ResponseBody) -> String {
    let mut text = Vec::new();
    while text.len() < MAX_ERROR_DETAIL {
        let Some(Ok(frame)) = body.frame().await else {
            break;
        };
        if let Some(data) = frame.data_ref() {
            text.extend_from_slice(data);
        }
    }
    text.truncate(MAX_ERROR_DETAIL);
    String::from_utf8_lossy(&text).trim().to_owned()
}

/// An over-long body is a bad response; anything else means the connection failed mid-body.
fn classify_body_error(error: BoxError) -> Error {
    if error.is::<LengthLimitError>() {
        Error::decode(error)
    } else {
        Error::transport(error)
    }
}

impl PeerGetter for HttpGetter {
    fn fetch<'a>(&'a self, ctx: &'a Context, request: &'a GetRequest) -> BoxFuture<'a, Result<GetResponse, Error>> {
        Box::pin(self.get(ctx, request))
    }
}

impl fmt::Debug for HttpGetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpGetter").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}
