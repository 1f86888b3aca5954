// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test doubles shared by the unit tests.

use std::io::Write;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;

use crate::{Context, Error, GetRequest, GetResponse, PeerGetter};

/// Captures formatted log output so tests can assert on emitted events.
#[derive(Debug, Clone, Default)]
pub(crate) struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn output(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    pub(crate) fn assert_contains(&self, expected: &str) {
        let output = self.output();
        assert!(output.contains(expected), "log output does not contain '{expected}', got:\n{output}");
    }

    /// A subscriber writing into this capture; install it with `set_default()`.
    pub(crate) fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + use<> {
        tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_writer(self.clone())
                .with_ansi(false),
        )
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter(Arc::clone(&self.buffer))
    }
}

#[derive(Debug)]
pub(crate) struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A peer that answers every request the same way and remembers what it was asked.
#[derive(Debug)]
pub(crate) struct StaticPeer {
    answer: Result<Bytes, Error>,
    requests: Mutex<Vec<GetRequest>>,
}

impl StaticPeer {
    pub(crate) fn answering(value: &'static [u8]) -> Self {
        Self {
            answer: Ok(Bytes::from_static(value)),
            requests: Mutex::default(),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            answer: Err(Error::transport("connection refused")),
            requests: Mutex::default(),
        }
    }

    pub(crate) fn requests(&self) -> Vec<GetRequest> {
        self.requests.lock().clone()
    }
}

impl PeerGetter for StaticPeer {
    fn fetch<'a>(&'a self, _ctx: &'a Context, request: &'a GetRequest) -> BoxFuture<'a, Result<GetResponse, Error>> {
        self.requests.lock().push(request.clone());
        let answer = self.answer.clone().map(|value| GetResponse { value });
        Box::pin(async move { answer })
    }
}
