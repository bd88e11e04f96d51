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

//! Resolution of clean URLs to `.html` files

use log::{debug, trace};
use std::io;
use std::path::{Path, PathBuf};

use crate::configuration::ServeConf;
use crate::error::is_not_found;
use crate::fs::{stat_entry, FileSystem, Stats};
use crate::path::resolve_path;

const EXTENSIONS: [&str; 2] = [".html", ".htm"];

/// A file found for a request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    /// Location of the file
    pub absolute: PathBuf,
    /// Request path of the file, e.g. `/dir/index.html`
    pub relative: String,
    /// File metadata
    pub stats: Stats,
}

fn candidates(relative: &str, extension: &str) -> Vec<String> {
    let base = relative.strip_suffix('/').unwrap_or(relative);
    let mut result = vec![format!("{base}/index{extension}")];

    // `/dir/` would produce `/dir.html` as well but `/` must not produce `/.html`
    if !base.is_empty() {
        result.push(format!("{base}{extension}"));
    }
    result
}

/// Looks for a file matching the clean URL `relative`: `index.html` in the directory of that
/// name or the path with `.html` appended, then the same with `.htm`.
///
/// Returns `None` if no candidate exists. File system errors other than "not found" are returned.
pub async fn find_related<F>(
    fs: &F,
    conf: &mut ServeConf,
    root: &Path,
    relative: &str,
) -> io::Result<Option<Found>>
where
    F: FileSystem + ?Sized,
{
    for extension in EXTENSIONS {
        for candidate in candidates(relative, extension) {
            let Ok(absolute) = resolve_path(root, &candidate) else {
                continue;
            };

            let result = stat_entry(fs, root, &absolute, conf).await;
            match result {
                Ok(stats) if stats.is_file() => {
                    debug!("clean URL {relative} resolved to {candidate}");
                    return Ok(Some(Found {
                        absolute,
                        relative: candidate,
                        stats,
                    }));
                }
                Ok(_) => trace!("clean URL candidate {candidate} isn't a file"),
                Err(err) if is_not_found(&err) => {
                    trace!("clean URL candidate {candidate} doesn't exist")
                }
                Err(err) => return Err(err),
            }
        }
    }
    Ok(None)
}
