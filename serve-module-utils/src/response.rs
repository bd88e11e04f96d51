// Copyright 2024 Wladimir Palant
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Abstraction of the response being produced for a request
//!
//! The hosting HTTP server provides an implementation of [`ResponseSink`]. Status and headers are
//! collected first, the first call to [`ResponseSink::write`] or [`ResponseSink::end`] commits
//! them.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Size of the chunks read from a byte stream before passing them on to the sink
pub const BUFFER_SIZE: usize = 64 * 1024;

/// A readable byte stream, e.g. file contents
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// The response of the hosting server
#[async_trait]
pub trait ResponseSink: Send {
    /// Returns the current response status.
    fn status(&self) -> StatusCode;

    /// Sets the response status.
    fn set_status(&mut self, status: StatusCode);

    /// Returns the response headers collected so far.
    fn headers(&self) -> &HeaderMap;

    /// Gives mutable access to the response headers.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sets a response header, replacing any existing values.
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers_mut().insert(name, value);
    }

    /// Retrieves a response header.
    fn header(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.headers().get(name)
    }

    /// Sends a chunk of the response body.
    async fn write(&mut self, chunk: Bytes) -> io::Result<()>;

    /// Completes the response, optionally sending a final chunk.
    async fn end(&mut self, chunk: Option<Bytes>) -> io::Result<()>;

    /// Pipes a byte stream into the response and completes it.
    async fn pipe(&mut self, mut stream: ByteStream) -> io::Result<()> {
        loop {
            let mut buf = BytesMut::zeroed(BUFFER_SIZE);
            let len = stream.read(buf.as_mut()).await?;
            if len == 0 {
                break;
            }
            buf.truncate(len);
            self.write(buf.freeze()).await?;
        }
        self.end(None).await
    }
}

/// A response sink recording everything, useful for tests and for buffering small responses
#[derive(Debug, Clone)]
pub struct TestResponse {
    /// Response status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body received so far
    pub body: BytesMut,
    /// Whether the response has been completed
    pub ended: bool,
}

impl Default for TestResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            ended: false,
        }
    }
}

impl TestResponse {
    /// Creates an empty response with status 200.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the response body as text, replacing invalid UTF-8 sequences.
    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns a header value as text if present.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

#[async_trait]
impl ResponseSink for TestResponse {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    async fn write(&mut self, chunk: Bytes) -> io::Result<()> {
        if self.ended {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "response already completed",
            ));
        }
        self.body.extend_from_slice(&chunk);
        Ok(())
    }

    async fn end(&mut self, chunk: Option<Bytes>) -> io::Result<()> {
        if let Some(chunk) = chunk {
            self.write(chunk).await?;
        }
        self.ended = true;
        Ok(())
    }
}
