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

//! # Static Files Module
//!
//! This crate resolves request paths to files in a directory and serves them. Before the file
//! system is accessed, request paths go through the redirects and rewrites of `rewrite-module`,
//! file responses get the custom headers of `headers-module`.
//!
//! ## Supported functionality
//!
//! * Clean URLs: `/about` is served from `about.html` or `about/index.html`, requests to
//!   `about.html` are redirected to `/about`
//! * Trailing slash normalization via redirects
//! * Directory listings as HTML or JSON (if the client accepts `application/json`), optionally
//!   serving the only file of a directory instead
//! * Custom `404.html` page
//! * Byte range requests via `Range` HTTP header
//! * Conditional requests via `If-None-Match` HTTP header with ETags computed from file contents
//! * Symbolic links treated as missing files unless explicitly allowed
//! * `HEAD` requests
//!
//! ## Known limitations
//!
//! * Requests with multiple byte ranges are not supported and will result in the full file being
//!   returned.
//! * `If-Range` and `If-Modified-Since` HTTP headers are ignored.
//!
//! ## Configuration
//!
//! All settings are on the top level of the configuration file, see [`ServeConf`]:
//!
//! ```yaml
//! public: dist
//! cleanUrls: true
//! trailingSlash: false
//! directoryListing: ["/downloads/**"]
//! unlisted: ["*.bak"]
//! rewrites:
//! - source: app/**
//!   destination: /index.html
//! headers:
//! - source: "**/*.js"
//!   headers:
//!   - key: Cache-Control
//!     value: max-age=3600
//! etag: true
//! ```
//!
//! ## Code example
//!
//! A web server creates a [`ServeHandler`] instance and calls it for every request. The response
//! is written into a [`ResponseSink`](serve_module_utils::ResponseSink) implementation.
//!
//! ```rust
//! use http::{Request, StatusCode};
//! use serve_module_utils::{FromYaml, TestResponse};
//! use static_files_module::{ServeConf, ServeHandler};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let conf = ServeConf::from_yaml("cleanUrls: true").unwrap();
//! let handler = ServeHandler::new(conf);
//!
//! let request = Request::get("/about.html").body(()).unwrap();
//! let mut response = TestResponse::new();
//! handler.handle((&request).into(), &mut response).await.unwrap();
//!
//! assert_eq!(response.status, StatusCode::MOVED_PERMANENTLY);
//! assert_eq!(response.header_str("location"), Some("/about"));
//! # }
//! ```
//!
//! File system access goes through the [`FileSystem`] trait. Custom implementations can be passed
//! to [`ServeHandler::with_file_system`] to override individual operations.

pub mod clean_url;
mod configuration;
mod error;
pub mod fs;
mod handler;
pub mod listing;
pub mod metadata;
pub mod path;
pub mod range;
#[cfg(test)]
mod tests;

pub use configuration::{ServeConf, ServeOpt, StaticFilesConf};
pub use error::{is_not_found, ServeError};
pub use fs::{FileKind, FileSystem, LocalFileSystem, Stats};
pub use handler::{serve, RequestHead, ServeHandler};
