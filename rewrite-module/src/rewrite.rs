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

//! Internal path rewriting

use log::{trace, warn};

use crate::configuration::RewriteRule;

/// Maximal number of rewrites applied to a single path
pub const MAX_REWRITES: usize = 32;

/// Applies rewrite rules to a request path.
///
/// The first matching rule produces a new path which is then matched against the full rule list
/// again. This stops once no rule matches, a rule produces the path it started from or after
/// [`MAX_REWRITES`] rewrites.
pub fn apply_rewrites(path: &str, rules: &[RewriteRule]) -> String {
    let mut current = path.to_owned();

    for _ in 0..MAX_REWRITES {
        let Some((rule, path_match)) = rules
            .iter()
            .find_map(|rule| rule.source.captures(&current).map(|m| (rule, m)))
        else {
            return current;
        };

        let rewritten = rule.destination.resolve(&path_match);
        trace!(
            "rewrite rule {} turned {current} into {rewritten}",
            rule.source.as_str()
        );
        if rewritten == current {
            return current;
        }
        current = rewritten;
    }

    warn!("rewriting {path} stopped after {MAX_REWRITES} steps, the rules are likely cyclic");
    current
}
