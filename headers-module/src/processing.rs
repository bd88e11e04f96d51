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

use http::HeaderMap;
use log::trace;

use crate::configuration::HeaderRule;

/// Applies the header rules matching `path` on top of the default headers.
///
/// Rules are applied in configuration order, so later rules override earlier ones. A patch
/// without a value removes the header.
pub fn compose_headers(rules: &[HeaderRule], path: &str, defaults: HeaderMap) -> HeaderMap {
    let mut headers = defaults;
    for rule in rules.iter().filter(|rule| rule.source.is_match(path)) {
        trace!("header rule {} applies to {path}", rule.source.as_str());
        for patch in &rule.headers {
            if let Some(value) = &patch.value {
                headers.insert(patch.name.clone(), value.clone());
            } else {
                headers.remove(&patch.name);
            }
        }
    }
    headers
}
