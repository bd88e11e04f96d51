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

//! Directory listings

use log::{debug, trace};
use maud::{html, DOCTYPE};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;
use std::cmp::Ordering;
use std::io;
use std::path::Path;

use crate::clean_url::Found;
use crate::configuration::ServeConf;
use crate::error::is_not_found;
use crate::fs::{FileSystem, Stats};

/// Entries never displayed in a listing
const EXCLUDED: [&str; 2] = [".DS_Store", ".git"];

const HREF: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A single entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    /// Display name, with slash suffix for directories
    pub base: String,
    /// Request path of the entry
    pub relative: String,
    /// Link title
    pub title: String,
    /// File extension without the dot, `txt` if missing (files only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
    /// Human-readable size (files only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Set for directories, these are sorted first
    #[serde(rename = "is-directory", skip_serializing_if = "std::ops::Not::not")]
    pub is_directory: bool,
}

/// Breadcrumb navigation element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    /// Display name
    pub name: String,
    /// Link target relative to the root, empty for the root itself
    pub url: String,
}

/// A directory listing ready to be rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    /// Directory entries, sorted
    pub files: Vec<ListingEntry>,
    /// Display name of the directory
    pub directory: String,
    /// Breadcrumb navigation
    pub paths: Vec<Breadcrumb>,
}

/// What to respond with for a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryContents {
    /// Display the listing
    Listing(Listing),
    /// Serve the only file in the directory instead of the listing
    Single(Found),
}

/// Formats a byte count like `27 B` or `2 KB`, using 1024 as base and rounding to whole units.
pub fn human_size(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{} {}", value.round(), UNITS[unit])
}

fn extension(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_owned(),
        _ => "txt".to_owned(),
    }
}

fn join_relative(directory: &str, name: &str) -> String {
    if directory.ends_with('/') {
        format!("{directory}{name}")
    } else {
        format!("{directory}/{name}")
    }
}

fn is_listed(conf: &ServeConf, name: &str) -> bool {
    if EXCLUDED.contains(&name) {
        return false;
    }
    let slashed = format!("/{name}");
    !conf
        .static_files
        .unlisted
        .iter()
        .any(|pattern| pattern.is_match(&slashed))
}

fn compare_entries(a: &ListingEntry, b: &ListingEntry) -> Ordering {
    b.is_directory
        .cmp(&a.is_directory)
        .then_with(|| a.base.cmp(&b.base))
}

fn breadcrumbs(parts: &[&str], suffix: &str) -> Vec<Breadcrumb> {
    parts
        .iter()
        .enumerate()
        .map(|(index, part)| {
            let is_last = index + 1 == parts.len();
            Breadcrumb {
                name: format!("{part}{}", if is_last { suffix } else { "/" }),
                url: if index == 0 {
                    String::new()
                } else {
                    format!("{}{suffix}", parts[1..=index].join("/"))
                },
            }
        })
        .collect()
}

async fn entry_stats<F>(
    fs: &F,
    conf: &mut ServeConf,
    path: &Path,
) -> io::Result<Option<Stats>>
where
    F: FileSystem + ?Sized,
{
    let result = fs.lstat(path, true, conf).await;
    let result = match result {
        Ok(stats) if stats.is_symlink() => {
            if !conf.static_files.symlinks {
                trace!("not listing symbolic link {path:?}");
                return Ok(None);
            }
            fs.stat(path, conf).await
        }
        result => result,
    };

    match result {
        Ok(stats) => Ok(Some(stats)),
        // Removed while listing or a dangling link
        Err(err) if is_not_found(&err) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Enumerates the directory at `absolute` with the request path `relative`.
///
/// Returns `None` if directory listings are disabled for this path. If `renderSingle` is enabled
/// and the directory contains only one file, that file is returned instead of a listing.
pub async fn read_directory<F>(
    fs: &F,
    conf: &mut ServeConf,
    root: &Path,
    relative: &str,
    absolute: &Path,
) -> io::Result<Option<DirectoryContents>>
where
    F: FileSystem + ?Sized,
{
    let directory_path = relative
        .strip_suffix('/')
        .filter(|path| !path.is_empty())
        .unwrap_or(relative);
    if !conf.static_files.directory_listing.applies(directory_path) {
        debug!("directory listing disabled for {relative}");
        return Ok(None);
    }

    let suffix = if conf.rewrite.trailing_slash == Some(false) {
        ""
    } else {
        "/"
    };

    let mut names = fs.readdir(absolute, conf).await?;
    names.retain(|name| is_listed(conf, name));

    let mut files = Vec::with_capacity(names.len());
    let mut single = None;
    for name in names {
        let path = absolute.join(&name);
        let Some(stats) = entry_stats(fs, conf, &path).await? else {
            continue;
        };

        let entry_relative = join_relative(relative, &name);
        let entry = if stats.is_dir() {
            let base = format!("{name}{suffix}");
            ListingEntry {
                title: base.clone(),
                base,
                relative: format!("{entry_relative}{suffix}"),
                ext: None,
                size: None,
                is_directory: true,
            }
        } else {
            single = Some(Found {
                absolute: path,
                relative: entry_relative.clone(),
                stats: stats.clone(),
            });
            ListingEntry {
                title: name.clone(),
                ext: Some(extension(&name)),
                size: Some(human_size(stats.size)),
                base: name,
                relative: entry_relative,
                is_directory: false,
            }
        };
        files.push(entry);
    }

    if conf.static_files.render_single && files.len() == 1 {
        if let Some(found) = single {
            debug!("rendering single file {} in {relative}", found.relative);
            return Ok(Some(DirectoryContents::Single(found)));
        }
    }

    files.sort_by(compare_entries);

    let parts = relative
        .split('/')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>();
    if !parts.is_empty() {
        let parent = &parts[..parts.len() - 1];
        let parent_relative = if parent.is_empty() {
            "/".to_owned()
        } else {
            format!("/{}{suffix}", parent.join("/"))
        };
        files.insert(
            0,
            ListingEntry {
                base: "..".to_owned(),
                relative: parent_relative.clone(),
                title: parent_relative,
                ext: None,
                size: None,
                is_directory: true,
            },
        );
    }

    let root_name = root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut all_parts = Vec::with_capacity(parts.len() + 1);
    if !root_name.is_empty() {
        all_parts.push(root_name.as_str());
    }
    all_parts.extend(parts.iter().copied());

    let directory = format!("{}{suffix}", all_parts.join("/"));
    let paths = breadcrumbs(&all_parts, suffix);

    Ok(Some(DirectoryContents::Listing(Listing {
        files,
        directory,
        paths,
    })))
}

impl Listing {
    /// Produces the JSON representation of the listing.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_owned())
    }

    /// Renders the listing as an HTML page.
    pub fn to_html(&self) -> String {
        html! {
            (DOCTYPE)
            html {
                head {
                    meta charset="utf-8";
                    meta name="viewport" content="width=device-width, initial-scale=1";
                    title {
                        "Files within " (self.directory)
                    }
                }

                body {
                    main {
                        header {
                            h1 {
                                i { "Index of " }
                                @for path in &self.paths {
                                    a href={ "/" (utf8_percent_encode(&path.url, HREF)) } {
                                        (path.name)
                                    }
                                }
                            }
                        }

                        ul id="files" {
                            @for file in &self.files {
                                @let class = match (file.is_directory, &file.ext) {
                                    (true, _) => "folder".to_owned(),
                                    (false, Some(ext)) => format!("file {ext}"),
                                    (false, None) => "file".to_owned(),
                                };
                                li {
                                    a
                                        href=(utf8_percent_encode(&file.relative, HREF))
                                        title=(file.title)
                                        class=(class)
                                    {
                                        (file.base)
                                    }
                                    @if let Some(size) = &file.size {
                                        " "
                                        span class="size" { (size) }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        .into()
    }
}
