// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Request, Response, StatusCode};
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use pct_str::PctStr;
use tokio::net::TcpListener;

use super::HttpPool;
use crate::{Context, Error, GetResponse, proto};

impl HttpPool {
    /// Answers a peer's request for a value.
    ///
    /// Requests are expected at `{base_path}{group}/{key}` with both segments percent-encoded.
    /// A malformed path is answered with `400`, an unknown group with `404` and a failed load
    /// with `500`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedPath`] for paths outside the base path. Such requests mean the
    /// pool was mounted at the wrong route, so they are not answered at all.
    pub async fn handle<B>(&self, request: Request<B>) -> Result<Response<Full<Bytes>>, Error> {
        let (parts, _) = request.into_parts();
        let path = parts.uri.path();

        let Some(rest) = path.strip_prefix(self.options.base_path()) else {
            tracing::event!(
                name: "groupcache.unexpected_path",
                tracing::Level::ERROR,
                path,
                base_path = self.options.base_path(),
            );
            return Err(Error::UnexpectedPath { path: path.to_owned() });
        };

        let segments = rest
            .split_once('/')
            .and_then(|(group, key)| Some((decode(group)?, decode(key)?)));
        let Some((group_name, key)) = segments else {
            return Ok(plain(StatusCode::BAD_REQUEST, "bad request".to_owned()));
        };

        let Some(group) = self.groups.get(&group_name) else {
            return Ok(plain(StatusCode::NOT_FOUND, Error::GroupNotFound(group_name).to_string()));
        };

        let ctx = self.options.context.as_ref().map_or_else(Context::new, |extract| extract(&parts));

        let value = match group.local_get(&ctx, &key).await {
            Ok(value) => value,
            Err(error) => return Ok(plain(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())),
        };

        let body = match (GetResponse { value: value.to_bytes() }).encode() {
            Ok(body) => body,
            Err(error) => return Ok(plain(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())),
        };

        tracing::event!(
            name: "groupcache.served",
            tracing::Level::DEBUG,
            group = %group_name,
            key = %key,
            bytes = value.len(),
        );

        let mut response = Response::new(Full::new(Bytes::from(body)));
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(proto::CONTENT_TYPE));
        Ok(response)
    }

    /// Serves peers on `listener` until accepting a connection fails.
    ///
    /// Each connection is handled on its own task. Connections carrying a request outside the base
    /// path are closed.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the accept loop.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
        loop {
            let (stream, remote) = listener.accept().await?;
            let pool = Arc::clone(&self);

            tokio::spawn(async move {
                let service = service_fn(move |request| {
                    let pool = Arc::clone(&pool);
                    async move { pool.handle(request).await }
                });

                if let Err(error) = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await {
                    tracing::event!(
                        name: "groupcache.connection_closed",
                        tracing::Level::DEBUG,
                        %remote,
                        %error,
                    );
                }
            });
        }
    }
}

fn decode(segment: &str) -> Option<String> {
    PctStr::new(segment).ok().map(PctStr::decode)
}

fn plain(status: StatusCode, message: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(message)));
    *response.status_mut() = status;
    response
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use byteview::ByteView;
    use http_body_util::{BodyExt, Empty};

    use super::*;
    use crate::testing::LogCapture;
    use crate::{CacheGroup, GroupRegistry, HttpPoolOptions, getter_fn};

    fn pool() -> HttpPool {
        let groups = Arc::new(GroupRegistry::new());
        let echo = getter_fn(|ctx: Context, key: String| async move {
            if key == "broken" {
                return Err(Error::load("disk on fire"));
            }
            let tenant = ctx.get::<String>().cloned().unwrap_or_default();
            Ok(ByteView::from(format!("{tenant}{key}")))
        });
        groups.register(CacheGroup::builder("images", echo).build()).expect("new group");

        let options = HttpPoolOptions::default().with_context_fn(|parts| {
            let mut ctx = Context::new();
            if let Some(tenant) = parts.headers.get("x-tenant").and_then(|v| v.to_str().ok()) {
                ctx.insert(format!("{tenant}:"));
            }
            ctx
        });
        HttpPool::with_options("http://10.0.0.1:8000", groups, options)
    }

    fn get(path: &str) -> Request<Empty<Bytes>> {
        Request::get(path).body(Empty::new()).expect("valid request")
    }

    async fn body_of(response: Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.expect("infallible body").to_bytes()
    }

    #[tokio::test]
    async fn serves_value() {
        let response = pool().handle(get("/_groupcache/images/cat.png")).await.expect("answered");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], proto::CONTENT_TYPE);
        let decoded = GetResponse::decode(&body_of(response).await).expect("valid message");
        assert_eq!(decoded.value, Bytes::from_static(b"cat.png"));
    }

    #[tokio::test]
    async fn segments_are_unescaped() {
        let response = pool().handle(get("/_groupcache/images/a%2Fb%20c")).await.expect("answered");

        let decoded = GetResponse::decode(&body_of(response).await).expect("valid message");
        assert_eq!(decoded.value, Bytes::from_static(b"a/b c"));
    }

    #[tokio::test]
    async fn context_comes_from_request_head() {
        let request = Request::get("/_groupcache/images/cat.png")
            .header("x-tenant", "contoso")
            .body(Empty::<Bytes>::new())
            .expect("valid request");

        let response = pool().handle(request).await.expect("answered");

        let decoded = GetResponse::decode(&body_of(response).await).expect("valid message");
        assert_eq!(decoded.value, Bytes::from_static(b"contoso:cat.png"));
    }

    #[tokio::test]
    async fn missing_key_segment_is_bad_request() {
        let response = pool().handle(get("/_groupcache/images")).await.expect("answered");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_group_is_not_found() {
        let response = pool().handle(get("/_groupcache/videos/cat.mp4")).await.expect("answered");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(response).await, "no such group: videos");
    }

    #[tokio::test]
    async fn failed_load_is_server_error() {
        let response = pool().handle(get("/_groupcache/images/broken")).await.expect("answered");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await, "loading value: disk on fire");
    }

    #[tokio::test]
    async fn path_outside_base_is_rejected() {
        use tracing_subscriber::util::SubscriberInitExt;

        let logs = LogCapture::new();
        let _guard = logs.subscriber().set_default();

        let error = pool().handle(get("/metrics")).await.expect_err("misrouted");

        assert!(matches!(error, Error::UnexpectedPath { ref path } if path == "/metrics"));
        logs.assert_contains("ERROR");
        logs.assert_contains("/metrics");
    }
}
