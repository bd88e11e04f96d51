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

//! Redirect decisions: clean URLs, trailing slashes and explicit redirect rules

use http::StatusCode;
use log::{trace, warn};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::configuration::RewriteConf;

/// Characters left alone when encoding redirect targets, the same ones `encodeURI` keeps
const URI_RESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

const CLEAN_SUFFIXES: [&str; 3] = [".html", ".htm", "/index"];

/// A redirect decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Redirect target, not encoded
    pub target: String,
    /// Response status
    pub status: StatusCode,
    /// If `true`, the target should be sent without encoding
    pub raw: bool,
}

impl Redirect {
    fn permanent(target: String) -> Self {
        Self {
            target: ensure_slash_start(&target),
            status: StatusCode::MOVED_PERMANENTLY,
            raw: false,
        }
    }

    /// Produces the value of the `Location` header.
    pub fn location(&self) -> String {
        if self.raw {
            self.target.clone()
        } else {
            utf8_percent_encode(&self.target, URI_RESERVED).to_string()
        }
    }
}

fn ensure_slash_start(target: &str) -> String {
    if target.starts_with('/') {
        target.to_owned()
    } else {
        format!("/{target}")
    }
}

fn collapse_slashes(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    for c in path.chars() {
        if c != '/' || !result.ends_with('/') {
            result.push(c);
        }
    }
    result
}

/// Checks whether the last path segment has an extension or is a dotfile.
fn last_segment_kind(path: &str) -> (bool, bool) {
    let name = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    let is_dotfile = name.starts_with('.');
    let has_extension = name.rfind('.').is_some_and(|index| index > 0);
    (has_extension, is_dotfile)
}

fn adjust_trailing_slash(path: &str, trailing_slash: bool) -> Option<String> {
    let is_trailed = path.ends_with('/');
    if !trailing_slash && is_trailed && path != "/" {
        Some(path[..path.len() - 1].to_owned())
    } else if trailing_slash && !is_trailed {
        let (has_extension, is_dotfile) = last_segment_kind(path);
        if !has_extension && !is_dotfile {
            Some(format!("{path}/"))
        } else {
            None
        }
    } else {
        None
    }
}

fn trailing_slash_target(path: &str, trailing_slash: bool) -> Option<String> {
    // Repeated slashes always redirect, the slash policy is applied to the collapsed path
    if path.contains("//") {
        let collapsed = collapse_slashes(path);
        return Some(adjust_trailing_slash(&collapsed, trailing_slash).unwrap_or(collapsed));
    }
    adjust_trailing_slash(path, trailing_slash)
}

/// Decides whether the decoded request path should be redirected.
///
/// Clean URL stripping happens first, trailing slash normalization is applied to the stripped
/// path. Explicit redirect rules are only considered if neither produced a redirect.
pub fn resolve_redirect(path: &str, conf: &RewriteConf, clean_url: bool) -> Option<Redirect> {
    let mut working = path.to_owned();
    let mut cleaned = false;
    if clean_url {
        if let Some(suffix) = CLEAN_SUFFIXES.iter().find(|suffix| path.ends_with(*suffix)) {
            working.truncate(path.len() - suffix.len());
            cleaned = true;
            trace!("clean URL for {path} is {working}");
        }
    }

    if let Some(trailing_slash) = conf.trailing_slash {
        let candidate = if working.is_empty() { "/" } else { &working };
        if let Some(target) = trailing_slash_target(candidate, trailing_slash) {
            return Some(Redirect::permanent(target));
        }
    }

    if cleaned {
        return Some(Redirect::permanent(collapse_slashes(&working)));
    }

    for rule in &conf.redirects {
        let Some(path_match) = rule.source.captures(path) else {
            continue;
        };

        let target = rule.destination.resolve(&path_match);
        let status = match rule.status_code.map(StatusCode::from_u16) {
            None => StatusCode::MOVED_PERMANENTLY,
            Some(Ok(status)) => status,
            Some(Err(_)) => {
                warn!(
                    "invalid status code configured for redirect rule {}, using 301",
                    rule.source.as_str()
                );
                StatusCode::MOVED_PERMANENTLY
            }
        };
        trace!(
            "redirect rule {} matched {path}, redirecting to {target}",
            rule.source.as_str()
        );
        return Some(Redirect {
            target,
            status,
            raw: rule.raw,
        });
    }

    None
}
