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

//! File system access
//!
//! All file system operations of the handler go through the [`FileSystem`] trait. Its default
//! methods delegate to the real file system, implementations can override individual operations,
//! e.g. to serve files from a different source or to observe file system access.

use async_trait::async_trait;
use log::{debug, trace};
use serve_module_utils::ByteStream;
use std::fs::Metadata;
use std::io::{self, SeekFrom};
use std::path::Path;
use std::time::SystemTime;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::configuration::ServeConf;

/// Type of a file system entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link (only reported by [`FileSystem::lstat`])
    Symlink,
    /// Anything else, e.g. a device or socket
    Other,
}

/// Metadata of a file system entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    /// Size in bytes
    pub size: u64,
    /// Last modification time if known
    pub modified: Option<SystemTime>,
    /// Entry type
    pub kind: FileKind,
}

impl Stats {
    /// Metadata of a regular file
    pub fn file(size: u64, modified: Option<SystemTime>) -> Self {
        Self {
            size,
            modified,
            kind: FileKind::File,
        }
    }

    /// Metadata of a directory
    pub fn directory() -> Self {
        Self {
            size: 0,
            modified: None,
            kind: FileKind::Directory,
        }
    }

    /// Checks whether this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    /// Checks whether this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Checks whether this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }
}

impl From<Metadata> for Stats {
    fn from(meta: Metadata) -> Self {
        let file_type = meta.file_type();
        let kind = if file_type.is_symlink() {
            FileKind::Symlink
        } else if file_type.is_dir() {
            FileKind::Directory
        } else if file_type.is_file() {
            FileKind::File
        } else {
            FileKind::Other
        };

        Self {
            size: meta.len(),
            modified: meta.modified().ok(),
            kind,
        }
    }
}

/// File system operations used by the handler
///
/// Each operation receives the configuration of the current request. Implementations may modify
/// it, later processing steps of the same request will see the changes.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Retrieves metadata of a path, following symbolic links.
    async fn stat(&self, path: &Path, _conf: &mut ServeConf) -> io::Result<Stats> {
        Ok(tokio::fs::metadata(path).await?.into())
    }

    /// Retrieves metadata of a path without following symbolic links. `listing` is `true` when
    /// this is called while enumerating a directory.
    async fn lstat(&self, path: &Path, _listing: bool, _conf: &mut ServeConf) -> io::Result<Stats> {
        Ok(tokio::fs::symlink_metadata(path).await?.into())
    }

    /// Lists the names of the entries in a directory.
    async fn readdir(&self, path: &Path, _conf: &mut ServeConf) -> io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => debug!("ignoring directory entry with non-Unicode name {name:?}"),
            }
        }
        Ok(names)
    }

    /// Opens a file for reading. If `range` is given, only the bytes from start to end (both
    /// inclusive) are produced.
    async fn open(
        &self,
        path: &Path,
        range: Option<(u64, u64)>,
        _conf: &mut ServeConf,
    ) -> io::Result<ByteStream> {
        let mut file = tokio::fs::File::open(path).await?;
        if let Some((start, end)) = range {
            trace!("opening {path:?} for bytes {start}-{end}");
            file.seek(SeekFrom::Start(start)).await?;
            Ok(Box::new(file.take(end - start + 1)))
        } else {
            Ok(Box::new(file))
        }
    }
}

/// File system access without any overrides
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {}

/// Retrieves metadata of a path within `root` according to the symbolic link policy.
///
/// With `symlinks` disabled every component below the root is checked, a symbolic link anywhere
/// on the way is reported as not found.
pub(crate) async fn stat_entry<F>(
    fs: &F,
    root: &Path,
    path: &Path,
    conf: &mut ServeConf,
) -> io::Result<Stats>
where
    F: FileSystem + ?Sized,
{
    if conf.static_files.symlinks {
        return fs.stat(path, conf).await;
    }

    let Ok(relative) = path.strip_prefix(root) else {
        debug!("{path:?} is outside of {root:?}, treating it as missing");
        return Err(io::ErrorKind::NotFound.into());
    };

    let mut current = root.to_path_buf();
    let mut stats = fs.stat(root, conf).await?;
    for component in relative.components() {
        if !stats.is_dir() {
            trace!("{current:?} isn't a directory");
            return Err(io::ErrorKind::NotFound.into());
        }

        current.push(component);
        stats = fs.lstat(&current, false, conf).await?;
        if stats.is_symlink() {
            debug!("{current:?} is a symbolic link, treating {path:?} as missing");
            return Err(io::ErrorKind::NotFound.into());
        }
    }
    Ok(stats)
}
