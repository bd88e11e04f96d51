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

//! Data structures required for `ServeHandler` configuration

use clap::Parser;
use headers_module::HeadersConf;
use rewrite_module::RewriteConf;
use serde::Deserialize;
use serve_module_utils::{OneOrMany, PathPattern, PathToggle};
use std::io;
use std::path::PathBuf;

/// Command line options of the static files module
#[derive(Debug, Default, Parser)]
pub struct ServeOpt {
    /// The directory to serve files from, defaults to the current directory.
    #[clap(short, long)]
    pub public: Option<PathBuf>,

    /// Strip .html extensions and resolve index.html files for extensionless paths.
    #[clap(long)]
    pub clean_urls: Option<bool>,

    /// Add (true) or remove (false) trailing slashes via redirects.
    #[clap(long)]
    pub trailing_slash: Option<bool>,

    /// Display a listing for directories without index file.
    #[clap(long)]
    pub directory_listing: Option<bool>,

    /// Serve the file directly if a directory contains only a single file.
    #[clap(long)]
    pub render_single: Option<bool>,

    /// Follow symbolic links instead of treating them as missing.
    #[clap(long)]
    pub symlinks: Option<bool>,

    /// Send ETag headers computed from file contents.
    #[clap(long)]
    pub etag: Option<bool>,
}

/// Configuration file settings of the static files module
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StaticFilesConf {
    /// The directory to serve files from. Relative paths are resolved against the current
    /// directory.
    #[serde(rename = "public")]
    pub public_root: Option<PathBuf>,

    /// Paths to display directory listings for (all by default)
    pub directory_listing: PathToggle,

    /// Patterns of directory entries that should not be listed
    pub unlisted: OneOrMany<PathPattern>,

    /// If `true`, a directory containing only a single file will serve this file instead of the
    /// listing.
    pub render_single: bool,

    /// If `true`, symbolic links are followed. Otherwise they are treated like missing files.
    pub symlinks: bool,
}

impl StaticFilesConf {
    /// Resolves the directory to serve files from.
    pub fn root(&self) -> io::Result<PathBuf> {
        let current = std::env::current_dir()?;
        Ok(match &self.public_root {
            Some(root) => current.join(root),
            None => current,
        })
    }
}

/// Complete configuration of the request handler
///
/// All settings are expected on the top level of the configuration file:
///
/// ```yaml
/// public: dist
/// cleanUrls: true
/// trailingSlash: false
/// rewrites:
/// - source: app/**
///   destination: /index.html
/// headers:
/// - source: "*.md"
///   headers:
///   - key: Content-Type
///     value: text/markdown; charset=utf-8
/// unlisted: [.env]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServeConf {
    /// Rewrites, redirects, trailing slashes and clean URLs
    #[serde(flatten)]
    pub rewrite: RewriteConf,

    /// Custom headers and ETag generation
    #[serde(flatten)]
    pub headers: HeadersConf,

    /// Root directory, directory listings and symbolic links
    #[serde(flatten)]
    pub static_files: StaticFilesConf,
}

impl ServeConf {
    /// Merges the command line options into the current configuration. Any command line options
    /// present overwrite existing settings.
    pub fn merge_with_opt(&mut self, opt: ServeOpt) {
        if opt.public.is_some() {
            self.static_files.public_root = opt.public;
        }

        if let Some(clean_urls) = opt.clean_urls {
            self.rewrite.clean_urls = clean_urls.into();
        }

        if opt.trailing_slash.is_some() {
            self.rewrite.trailing_slash = opt.trailing_slash;
        }

        if let Some(directory_listing) = opt.directory_listing {
            self.static_files.directory_listing = directory_listing.into();
        }

        if let Some(render_single) = opt.render_single {
            self.static_files.render_single = render_single;
        }

        if let Some(symlinks) = opt.symlinks {
            self.static_files.symlinks = symlinks;
        }

        if let Some(etag) = opt.etag {
            self.headers.etag = etag;
        }
    }
}
