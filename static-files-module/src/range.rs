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

//! Byte range processing (`Range` HTTP header)

use http::{header, HeaderMap};

/// A single byte range requested via the `Range` header
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Range {
    /// Inclusive start and end offsets within the file
    Valid(u64, u64),
    /// The range cannot be satisfied for this file (`416 Range Not Satisfiable`)
    OutOfBounds,
}

impl Range {
    /// Parses a `Range` header value like `bytes=0-499`, `bytes=500-` or `bytes=-10` for a file
    /// of the given size. Values in a format that isn’t understood produce `None`, including
    /// lists of multiple ranges.
    ///
    /// An end offset past the end of file is clamped to the last byte.
    pub fn parse(value: &str, file_size: u64) -> Option<Self> {
        let bounds = value.trim().strip_prefix("bytes")?.trim_start().strip_prefix('=')?;
        let (first, last) = bounds.split_once('-')?;
        let last_byte = file_size.saturating_sub(1);

        let (start, end) = match (first.trim(), last.trim()) {
            ("", suffix) => {
                let len: u64 = suffix.parse().ok()?;
                if len == 0 || len > file_size {
                    return Some(Self::OutOfBounds);
                }
                (file_size - len, last_byte)
            }
            (start, "") => (start.parse().ok()?, last_byte),
            (start, end) => (start.parse().ok()?, end.parse::<u64>().ok()?.min(last_byte)),
        };

        Some(if start < file_size && start <= end {
            Self::Valid(start, end)
        } else {
            Self::OutOfBounds
        })
    }

    /// Number of bytes covered by a valid range
    pub fn byte_count(&self) -> u64 {
        match self {
            Self::Valid(start, end) => end - start + 1,
            Self::OutOfBounds => 0,
        }
    }
}

/// Extracts the byte range requested by the `Range` header.
///
/// Nothing is returned if the header is absent or unparsable, or if the file is empty.
pub fn extract_range(headers: &HeaderMap, file_size: u64) -> Option<Range> {
    if file_size == 0 {
        return None;
    }

    let value = headers.get(header::RANGE)?.to_str().ok()?;
    Range::parse(value, file_size)
}
