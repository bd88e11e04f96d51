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

//! Structures required to deserialize Headers Module configuration from YAML configuration files.

use http::header::{HeaderName, HeaderValue};
use serde::Deserialize;
use serve_module_utils::deserialize::deserialize_nullable_string;
use serve_module_utils::PathPattern;
use thiserror::Error;

/// Errors produced when a header patch is invalid
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidHeader {
    /// Header name contains invalid characters
    #[error("invalid header name {0:?}")]
    Name(String),
    /// Header value contains invalid characters
    #[error("invalid header value {0:?}")]
    Value(String),
}

#[derive(Debug, Deserialize)]
struct RawHeaderPatch {
    key: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    value: Option<String>,
}

/// A single header operation: set a value or delete the header if the value is `None`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawHeaderPatch")]
pub struct HeaderPatch {
    /// Header name
    pub name: HeaderName,
    /// New header value, `None` removes the header
    pub value: Option<HeaderValue>,
}

impl HeaderPatch {
    /// Creates a patch setting or, with `value` being `None`, deleting a header.
    pub fn new(name: &str, value: Option<&str>) -> Result<Self, InvalidHeader> {
        let name =
            HeaderName::try_from(name).map_err(|_| InvalidHeader::Name(name.to_owned()))?;
        let value = value
            .map(|value| {
                HeaderValue::try_from(value).map_err(|_| InvalidHeader::Value(value.to_owned()))
            })
            .transpose()?;
        Ok(Self { name, value })
    }
}

impl TryFrom<RawHeaderPatch> for HeaderPatch {
    type Error = InvalidHeader;

    fn try_from(value: RawHeaderPatch) -> Result<Self, Self::Error> {
        Self::new(&value.key, value.value.as_deref())
    }
}

/// Header operations applying to request paths matched by a pattern
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeaderRule {
    /// Pattern the path has to match
    pub source: PathPattern,
    /// Header operations, applied in order
    pub headers: Vec<HeaderPatch>,
}

impl HeaderRule {
    /// Creates a rule from a source pattern and a list of header operations.
    pub fn new(source: &str, headers: Vec<HeaderPatch>) -> Result<Self, regex::Error> {
        Ok(Self {
            source: PathPattern::new(source)?,
            headers,
        })
    }
}

/// Configuration file settings of the headers module
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HeadersConf {
    /// Header rules, applied in order
    pub headers: Vec<HeaderRule>,

    /// If `true`, a strong `ETag` header computed from file contents is sent along with
    /// `Last-Modified`
    pub etag: bool,
}
