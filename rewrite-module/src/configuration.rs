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

//! Structures required to deserialize Rewrite Module configuration from YAML configuration files.

use log::debug;
use serde::Deserialize;
use serve_module_utils::matcher::{normalize, PathMatch, PathPattern};
use serve_module_utils::PathToggle;

#[derive(Debug, Clone, PartialEq, Eq)]
enum DestinationPart {
    Literal(String),
    Segment(String),
}

/// Parsed representation of a rule destination with `:name` placeholders
///
/// Placeholders are replaced by the segments captured when matching the rule source, either by
/// name (`:segment`) or by position (`:0`, `:1`, … for captures of `*` and `**`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub struct Destination {
    parts: Vec<DestinationPart>,
    absolute: bool,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Checks whether the value starts with a URI scheme like `https:`.
fn has_scheme(value: &str) -> bool {
    let Some((scheme, _)) = value.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl From<&str> for Destination {
    fn from(value: &str) -> Self {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = value.char_indices().peekable();
        while let Some((index, c)) = chars.next() {
            if c == ':' && chars.peek().is_some_and(|(_, next)| is_name_char(*next)) {
                let start = index + 1;
                let mut end = start;
                while let Some((index, next)) = chars.peek() {
                    if !is_name_char(*next) {
                        break;
                    }
                    end = index + next.len_utf8();
                    chars.next();
                }

                if !literal.is_empty() {
                    parts.push(DestinationPart::Literal(std::mem::take(&mut literal)));
                }
                parts.push(DestinationPart::Segment(value[start..end].to_owned()));
            } else {
                literal.push(c);
            }
        }
        if !literal.is_empty() {
            parts.push(DestinationPart::Literal(literal));
        }

        Self {
            parts,
            absolute: has_scheme(value),
        }
    }
}

impl From<String> for Destination {
    fn from(value: String) -> Self {
        value.as_str().into()
    }
}

impl Destination {
    /// Returns `true` if the destination carries a URI scheme and is passed through without
    /// path normalization.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Substitutes captured segments into the destination.
    ///
    /// Placeholders without a corresponding segment are kept as is. Unless the destination is
    /// absolute, the result is normalized into a path with a leading slash.
    pub fn resolve(&self, path_match: &PathMatch) -> String {
        let mut result = String::new();
        for part in &self.parts {
            match part {
                DestinationPart::Literal(value) => result.push_str(value),
                DestinationPart::Segment(name) => {
                    if let Some(value) = path_match.get(name) {
                        result.push_str(value);
                    } else {
                        debug!("no segment {name} captured, keeping placeholder");
                        result.push(':');
                        result.push_str(name);
                    }
                }
            }
        }

        if self.absolute {
            result
        } else {
            normalize(&result)
        }
    }
}

/// An internal rewrite, changing the path used to look up files
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RewriteRule {
    /// Pattern the request path has to match
    pub source: PathPattern,

    /// New path, `:name` placeholders are replaced by the captured segments
    pub destination: Destination,
}

impl RewriteRule {
    /// Creates a rule from source pattern and destination.
    pub fn new(source: &str, destination: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: PathPattern::new(source)?,
            destination: destination.into(),
        })
    }
}

/// A redirect rule resulting in a redirect response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RedirectRule {
    /// Pattern the request path has to match
    pub source: PathPattern,

    /// Redirect target, `:name` placeholders are replaced by the captured segments
    pub destination: Destination,

    /// Status code of the redirect response, 301 if missing
    #[serde(default, rename = "statusCode", alias = "type")]
    pub status_code: Option<u16>,

    /// If `true`, the target is sent without URI encoding
    #[serde(default)]
    pub raw: bool,
}

impl RedirectRule {
    /// Creates a rule from source pattern and destination.
    pub fn new(source: &str, destination: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: PathPattern::new(source)?,
            destination: destination.into(),
            status_code: None,
            raw: false,
        })
    }
}

/// Configuration file settings of the rewrite module
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RewriteConf {
    /// Internal rewrites, applied in order
    pub rewrites: Vec<RewriteRule>,

    /// Redirect rules, first match wins
    pub redirects: Vec<RedirectRule>,

    /// Adds (`true`) or removes (`false`) trailing slashes via redirects
    pub trailing_slash: Option<bool>,

    /// Strips `.html`/`.htm` extensions and `/index` from request paths
    pub clean_urls: PathToggle,
}
