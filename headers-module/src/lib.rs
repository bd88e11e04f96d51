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

//! # Headers Module
//!
//! This crate applies configured HTTP headers to responses. Each rule names a path pattern and a
//! list of header operations:
//!
//! ```yaml
//! headers:
//! - source: "**/*.@(jpg|jpeg|gif|png)"
//!   headers:
//!   - key: Cache-Control
//!     value: max-age=7200
//! - source: 404.html
//!   headers:
//!   - key: Cache-Control
//!     value: null
//! etag: true
//! ```
//!
//! Rules are applied in order on top of the default headers produced for a response, so later
//! rules override earlier ones. A `null` value removes the header, e.g. a default header or one
//! set by an earlier rule. With `etag` enabled, file responses get an `ETag` header computed from
//! the file contents.
//!
//! ```rust
//! use headers_module::{compose_headers, HeadersConf};
//! use http::HeaderMap;
//! use serve_module_utils::FromYaml;
//!
//! let conf = HeadersConf::from_yaml(r#"
//!     headers:
//!     - source: "*.txt"
//!       headers:
//!       - key: X-Text
//!         value: "yes"
//! "#).unwrap();
//!
//! let headers = compose_headers(&conf.headers, "/file.txt", HeaderMap::new());
//! assert_eq!(headers.get("x-text").unwrap(), "yes");
//! ```

pub mod configuration;
mod processing;

pub use configuration::{HeaderPatch, HeaderRule, HeadersConf, InvalidHeader};
pub use processing::compose_headers;
