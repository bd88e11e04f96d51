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

//! Path resolution logic

use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};

use crate::error::ServeError;

/// Decodes the percent-encoded path of a request URI.
///
/// Every `%` has to be followed by two hexadecimal digits and the result has to be valid UTF-8,
/// otherwise [`ServeError::Malformed`] is returned. Encoded NUL characters are rejected as well.
pub fn decode_uri_path(path: &str) -> Result<String, ServeError> {
    let bytes = path.as_bytes();
    let mut pos = 0;
    while let Some(offset) = bytes[pos..].iter().position(|&b| b == b'%') {
        let start = pos + offset;
        let valid = bytes
            .get(start + 1..start + 3)
            .is_some_and(|digits| digits.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            return Err(ServeError::Malformed("invalid percent encoding"));
        }
        pos = start + 3;
    }

    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map_err(|_| ServeError::Malformed("path is not valid UTF-8"))?;
    if decoded.contains('\0') {
        return Err(ServeError::Malformed("path contains NUL characters"));
    }
    Ok(decoded.into_owned())
}

/// Resolves a request path against the root directory.
///
/// `.` and `..` segments are resolved without accessing the file system. A path leading outside
/// of the root directory results in [`ServeError::Malformed`].
pub fn resolve_path(root: &Path, path: &str) -> Result<PathBuf, ServeError> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(ServeError::Malformed("path outside of root directory"));
                }
            }
            segment => {
                #[cfg(windows)]
                if segment.contains(['\\', ':']) {
                    return Err(ServeError::Malformed("invalid characters in path"));
                }
                segments.push(segment);
            }
        }
    }

    let mut result = root.to_path_buf();
    result.extend(segments);
    Ok(result)
}
