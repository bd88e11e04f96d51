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

//! Error type of the request handler

use serve_module_utils::standard_response::ErrorPage;
use std::io;

/// Errors occurring while resolving a request
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// The requested file system entry does not exist
    #[error("requested path could not be found")]
    NotFound,

    /// The request path is invalid or points outside the root directory
    #[error("malformed request path: {0}")]
    Malformed(&'static str),

    /// A file system operation or writing the response failed
    #[error(transparent)]
    Upstream(#[from] io::Error),
}

impl ServeError {
    /// Classifies an I/O error, recognizing "not found" conditions.
    pub fn from_io(err: io::Error) -> Self {
        if is_not_found(&err) {
            Self::NotFound
        } else {
            Self::Upstream(err)
        }
    }

    /// Returns the error page to be displayed for this error.
    pub fn page(&self) -> &'static ErrorPage {
        match self {
            Self::NotFound => &ErrorPage::NOT_FOUND,
            Self::Malformed(_) => &ErrorPage::BAD_REQUEST,
            Self::Upstream(_) => &ErrorPage::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Checks whether an I/O error means that the file system entry does not exist.
///
/// Apart from actual "not found" errors this also covers paths where a file is used like a
/// directory.
pub fn is_not_found(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::NotFound {
        return true;
    }

    // ENOTDIR
    #[cfg(unix)]
    if err.raw_os_error() == Some(20) {
        return true;
    }

    false
}
