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

//! # Rewrite Module
//!
//! This crate transforms request paths before files are looked up. Internal rewrites change the
//! path used for the lookup without the client noticing, redirects make the client emit a new
//! request. A configuration could look like this:
//!
//! ```yaml
//! rewrites:
//! - source: app/**
//!   destination: /index.html
//! - source: projects/:id/edit
//!   destination: /edit-project-:id.html
//! redirects:
//! - source: /old/:page
//!   destination: /new/:page
//! - source: /docs/**
//!   destination: https://docs.example.com/:0
//!   statusCode: 302
//! trailingSlash: false
//! cleanUrls: true
//! ```
//!
//! ## Rules
//!
//! Rule sources are path patterns, see [`serve_module_utils::matcher`]. Segments captured by the
//! source replace the `:name` placeholders of the destination, captures of `*` and `**` are
//! available as `:0`, `:1` and so on. Destinations with a URI scheme like `https:` are used as is,
//! other destinations are normalized into absolute paths.
//!
//! Rewrite rules are applied repeatedly: the first matching rule produces a new path which is
//! then matched against all rules again. For redirect rules, only the first matching rule
//! counts. The response status defaults to 301 and can be changed via `statusCode`. Setting
//! `raw: true` makes the target go into the `Location` header without URI encoding.
//!
//! ## Trailing slashes and clean URLs
//!
//! With `trailingSlash: true`, paths without a file extension get a trailing slash added via
//! redirect, `trailingSlash: false` removes trailing slashes. Repeated slashes are always
//! collapsed when `trailingSlash` is set.
//!
//! With clean URLs enabled (all paths by default, or a list of path patterns), requests to
//! `.html` and `.htm` files or to `/index` are redirected to the path without the suffix.
//!
//! ## Code example
//!
//! ```rust
//! use rewrite_module::{apply_rewrites, resolve_redirect, RewriteConf};
//! use serve_module_utils::FromYaml;
//!
//! let conf = RewriteConf::from_yaml(r#"
//!     rewrites:
//!     - source: app/**
//!       destination: /index.html
//!     redirects:
//!     - source: /old/:page
//!       destination: /new/:page
//! "#).unwrap();
//!
//! assert_eq!(apply_rewrites("/app/settings", &conf.rewrites), "/index.html");
//!
//! let redirect = resolve_redirect("/old/about", &conf, false).unwrap();
//! assert_eq!(redirect.location(), "/new/about");
//! ```

pub mod configuration;
mod redirect;
mod rewrite;

pub use configuration::{Destination, RedirectRule, RewriteConf, RewriteRule};
pub use redirect::{resolve_redirect, Redirect};
pub use rewrite::{apply_rewrites, MAX_REWRITES};
