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

//! Matching of request paths against configured source patterns.
//!
//! A [`PathPattern`] is compiled from a string like `/docs/**`, `*.md`, `face/:id` or
//! `!face/**` and supports two strategies:
//!
//! * Glob matching: `*` matches within a path segment, `**` as a whole segment matches any number
//!   of segments, `?` matches a single character, `[...]` is a character class, `{a,b}` and
//!   extglob groups like `+(a|b)` are alternatives. A leading `!` negates the result.
//! * Template matching: `:name` captures a single segment, `:name+` one or more segments, `**`
//!   and a trailing `*` capture greedily, any other `*` captures a single segment. Unnamed
//!   captures are keyed by their index (`0`, `1`, …).
//!
//! Template matching is attempted first when segments are requested, glob matching serves as the
//! fallback.

use log::trace;
use regex::Regex;
use serde::Deserialize;

/// Normalizes a path into an absolute slash-separated form.
///
/// `.` and `..` segments are resolved, repeated slashes are collapsed and a leading slash is
/// added. A trailing slash is preserved.
pub fn normalize(value: &str) -> String {
    let mut segments = Vec::new();
    for segment in value.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    let mut result = String::with_capacity(value.len() + 1);
    for segment in &segments {
        result.push('/');
        result.push_str(segment);
    }
    if result.is_empty() || value.ends_with('/') {
        result.push('/');
    }
    result
}

/// Normalizes a pattern via [`normalize`], keeping a negation prefix (`!`) intact.
pub fn slash_pattern(value: &str) -> String {
    if let Some(negated) = value.strip_prefix('!') {
        format!("!{}", normalize(negated))
    } else {
        normalize(value)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Finds the position of the bracket closing the one at `start`, respecting nesting.
fn find_closing(chars: &[char], start: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0;
    let mut pos = start;
    while pos < chars.len() {
        let c = chars[pos];
        if c == '\\' {
            pos += 2;
            continue;
        }
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(pos);
            }
        }
        pos += 1;
    }
    None
}

/// Splits a group body at top-level separators.
fn split_alternatives(chars: &[char], separator: char) -> Vec<&[char]> {
    let mut result = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (pos, &c) in chars.iter().enumerate() {
        match c {
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                result.push(&chars[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    result.push(&chars[start..]);
    result
}

struct Compiler<'a> {
    chars: &'a [char],
    pos: usize,
    template: bool,
    keys: Vec<String>,
    unnamed: usize,
    out: String,
}

impl<'a> Compiler<'a> {
    fn new(chars: &'a [char], template: bool) -> Self {
        Self {
            chars,
            pos: 0,
            template,
            keys: Vec::new(),
            unnamed: 0,
            out: String::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn push_literal(&mut self, c: char) {
        let mut buf = [0; 4];
        self.out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
    }

    fn push_unnamed_capture(&mut self, expression: &str) {
        self.out.push('(');
        self.out.push_str(expression);
        self.out.push(')');
        self.keys.push(self.unnamed.to_string());
        self.unnamed += 1;
    }

    fn fragment(chars: &[char]) -> String {
        let mut compiler = Compiler::new(chars, false);
        compiler.run();
        compiler.out
    }

    fn run(&mut self) {
        while let Some(c) = self.peek(0) {
            match c {
                '*' | '?' | '+' | '@' if self.peek(1) == Some('(') => self.extglob(c),
                '*' => self.star(),
                '?' => {
                    self.out.push_str("[^/]");
                    self.pos += 1;
                }
                '[' => self.class(),
                '{' => self.braces(),
                ':' if self.template && self.peek(1).is_some_and(is_name_char) => self.parameter(),
                '\\' if self.peek(1).is_some() => {
                    self.push_literal(self.chars[self.pos + 1]);
                    self.pos += 2;
                }
                c => {
                    self.push_literal(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn star(&mut self) {
        if self.peek(1) == Some('*') {
            let starts_segment = self.pos == 0 || self.out.ends_with('/');
            self.pos += 2;
            let ends_segment = matches!(self.peek(0), None | Some('/'));

            if self.template {
                self.push_unnamed_capture(".*");
            } else if starts_segment && ends_segment {
                // Zero segments should match as well, so the preceding slash becomes optional
                if self.out.ends_with('/') {
                    self.out.pop();
                }
                self.out.push_str("(?:/[^/]*)*");
            } else {
                self.out.push_str("[^/]*");
            }
        } else {
            self.pos += 1;
            if self.template {
                if self.peek(0).is_none() {
                    self.push_unnamed_capture(".*");
                } else {
                    self.push_unnamed_capture("[^/]*");
                }
            } else {
                self.out.push_str("[^/]*");
            }
        }
    }

    fn extglob(&mut self, operator: char) {
        let open = self.pos + 1;
        let Some(close) = find_closing(self.chars, open, '(', ')') else {
            self.push_literal(operator);
            self.pos += 1;
            return;
        };

        let alternatives = split_alternatives(&self.chars[open + 1..close], '|')
            .into_iter()
            .map(Self::fragment)
            .collect::<Vec<_>>()
            .join("|");
        let quantifier = match operator {
            '+' => "+",
            '*' => "*",
            '?' => "?",
            _ => "",
        };
        self.out.push_str(&format!("(?:{alternatives}){quantifier}"));
        self.pos = close + 1;
    }

    fn class(&mut self) {
        // A `]` immediately after the opening bracket (or negation) is part of the class
        let mut body_start = self.pos + 1;
        let negated = matches!(self.chars.get(body_start), Some('!' | '^'));
        if negated {
            body_start += 1;
        }
        let close = self.chars[(body_start + 1).min(self.chars.len())..]
            .iter()
            .position(|&c| c == ']')
            .map(|index| index + body_start + 1);

        let Some(close) = close else {
            self.push_literal('[');
            self.pos += 1;
            return;
        };

        self.out.push('[');
        if negated {
            self.out.push('^');
        }
        for &c in &self.chars[body_start..close] {
            if matches!(c, '\\' | '[' | ']' | '&' | '~' | '^') {
                self.out.push('\\');
            }
            self.out.push(c);
        }
        self.out.push(']');
        self.pos = close + 1;
    }

    fn braces(&mut self) {
        let Some(close) = find_closing(self.chars, self.pos, '{', '}') else {
            self.push_literal('{');
            self.pos += 1;
            return;
        };

        let alternatives = split_alternatives(&self.chars[self.pos + 1..close], ',');
        if alternatives.len() < 2 {
            self.push_literal('{');
            self.pos += 1;
            return;
        }

        let alternatives = alternatives
            .into_iter()
            .map(Self::fragment)
            .collect::<Vec<_>>()
            .join("|");
        self.out.push_str(&format!("(?:{alternatives})"));
        self.pos = close + 1;
    }

    fn parameter(&mut self) {
        self.pos += 1;
        let start = self.pos;
        while self.peek(0).is_some_and(is_name_char) {
            self.pos += 1;
        }
        let name = self.chars[start..self.pos].iter().collect::<String>();

        match self.peek(0) {
            Some('+') => {
                self.pos += 1;
                self.out.push_str("([^/]+(?:/[^/]+)*)");
            }
            Some('?') => {
                self.pos += 1;
                if self.out.ends_with('/') {
                    self.out.pop();
                    self.out.push_str("(?:/([^/]+?))?");
                } else {
                    self.out.push_str("([^/]+?)?");
                }
            }
            _ => self.out.push_str("([^/]+?)"),
        }
        self.keys.push(name);
    }
}

#[derive(Debug, Clone)]
struct Template {
    regex: Regex,
    keys: Vec<String>,
}

/// Segments captured by a template match, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMatch {
    /// Names and values of the captured segments
    pub segments: Vec<(String, String)>,
}

impl PathMatch {
    /// Looks up a captured segment by its name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.segments
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A compiled source pattern as used by rewrite, redirect, header and listing rules
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct PathPattern {
    source: String,
    negated: bool,
    glob: Regex,
    template: Option<Template>,
}

impl PathPattern {
    /// Compiles a pattern. Fails only if the resulting regular expression is invalid, e.g. due to
    /// an unsupported character class.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let slashed = slash_pattern(source);
        let (negated, pattern) = if let Some(pattern) = slashed.strip_prefix('!') {
            (true, pattern)
        } else {
            (false, slashed.as_str())
        };
        let chars = pattern.chars().collect::<Vec<_>>();

        let mut compiler = Compiler::new(&chars, false);
        compiler.run();
        let glob = Regex::new(&format!("^{}$", compiler.out))?;

        // Negated patterns cannot capture anything
        let template = if negated {
            None
        } else {
            let mut compiler = Compiler::new(&chars, true);
            compiler.run();
            let regex = Regex::new(&format!("^{}/?$", compiler.out))?;
            Some(Template {
                regex,
                keys: compiler.keys,
            })
        };

        trace!("compiled pattern {source:?}, glob: {glob}, template: {template:?}");

        Ok(Self {
            source: source.to_owned(),
            negated,
            glob,
            template,
        })
    }

    /// Returns the pattern as originally configured.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Checks whether the path matches the pattern as a glob.
    pub fn is_match(&self, path: &str) -> bool {
        self.glob.is_match(&normalize(path)) != self.negated
    }

    /// Matches the path and extracts named segments. Template matching is attempted first, glob
    /// matching is the fallback producing no segments.
    pub fn captures(&self, path: &str) -> Option<PathMatch> {
        let path = normalize(path);

        if let Some(template) = &self.template {
            if let Some(captures) = template.regex.captures(&path) {
                let segments = template
                    .keys
                    .iter()
                    .zip(captures.iter().skip(1))
                    .map(|(key, value)| {
                        (
                            key.clone(),
                            value.map_or_else(String::new, |value| value.as_str().to_owned()),
                        )
                    })
                    .collect();
                return Some(PathMatch { segments });
            }
        }

        if self.glob.is_match(&path) != self.negated {
            Some(PathMatch::default())
        } else {
            None
        }
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for PathPattern {}

impl TryFrom<&str> for PathPattern {
    type Error = regex::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for PathPattern {
    type Error = regex::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn pattern(source: &str) -> PathPattern {
        PathPattern::new(source).unwrap()
    }

    fn segments(source: &str, path: &str) -> Option<Vec<(String, String)>> {
        pattern(source)
            .captures(path)
            .map(|path_match| path_match.segments)
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("face/**"), "/face/**");
        assert_eq!(normalize("//a///b/"), "/a/b/");
        assert_eq!(normalize("/a/./b/../c"), "/a/c");
        assert_eq!(normalize("/../../x"), "/x");
        assert_eq!(slash_pattern("!face/**"), "!/face/**");
    }

    #[test]
    fn glob() {
        assert!(pattern("*.md").is_match("/docs.md"));
        assert!(!pattern("*.md").is_match("/dir/docs.md"));
        assert!(pattern("**/*.md").is_match("/dir/docs.md"));
        assert!(pattern("object.json").is_match("/object.json"));
        assert!(pattern("**").is_match("/"));
        assert!(pattern("**").is_match("/a/b/c"));
        assert!(pattern("face/**").is_match("/face"));
        assert!(pattern("face/**").is_match("/face/a/b"));
        assert!(!pattern("face/**").is_match("/faces/a"));
        assert!(pattern("face/*/mask").is_match("/face/delete/mask"));
        assert!(!pattern("face/*/mask").is_match("/face/a/b/mask"));
        assert!(pattern("/directory**").is_match("/directory"));
        assert!(pattern("file?.txt").is_match("/file1.txt"));
        assert!(pattern("file[0-9].txt").is_match("/file5.txt"));
        assert!(!pattern("file[!0-9].txt").is_match("/file5.txt"));
        assert!(pattern("*.{png,jpg}").is_match("/image.jpg"));
        assert!(!pattern("*.{png,jpg}").is_match("/image.gif"));
        assert!(pattern("a.b").is_match("/a.b"));
        assert!(!pattern("a.b").is_match("/axb"));
    }

    #[test]
    fn negation() {
        assert!(!pattern("!face/**").is_match("/face/mask"));
        assert!(pattern("!face/**").is_match("/test/mask"));
        assert_eq!(segments("!face/**", "/test/mask"), Some(Vec::new()));
        assert_eq!(segments("!face/**", "/face/mask"), None);
    }

    #[test]
    fn extglob() {
        let extglob = pattern("face/+(mask1|mask2)/ideal");
        assert!(extglob.is_match("/face/mask1/ideal"));
        assert!(extglob.is_match("/face/mask2/ideal"));
        assert!(!extglob.is_match("/face/mask3/ideal"));
        assert!(extglob.captures("/face/mask1/ideal").is_some());

        assert!(pattern("@(a|b).txt").is_match("/a.txt"));
        assert!(!pattern("@(a|b).txt").is_match("/ab.txt"));
        assert!(pattern("x?(y).txt").is_match("/x.txt"));
    }

    #[test]
    fn named_segments() {
        assert_eq!(
            segments("face/:segment", "/face/me"),
            Some(vec![("segment".to_owned(), "me".to_owned())])
        );
        assert_eq!(
            segments("face/:segment", "/face/me/"),
            Some(vec![("segment".to_owned(), "me".to_owned())])
        );
        assert_eq!(segments("face/:segment", "/face/me/too"), None);
        assert_eq!(
            segments("docs/:path+", "/docs/a/b/c"),
            Some(vec![("path".to_owned(), "a/b/c".to_owned())])
        );
        assert_eq!(
            segments("user/:id/:tab?", "/user/12"),
            Some(vec![
                ("id".to_owned(), "12".to_owned()),
                ("tab".to_owned(), String::new())
            ])
        );
        assert_eq!(
            segments("user/:id/:tab?", "/user/12/settings"),
            Some(vec![
                ("id".to_owned(), "12".to_owned()),
                ("tab".to_owned(), "settings".to_owned())
            ])
        );
    }

    #[test]
    fn unnamed_segments() {
        assert_eq!(
            segments("face/**", "/face/a/b"),
            Some(vec![("0".to_owned(), "a/b".to_owned())])
        );
        assert_eq!(
            segments("face/*/mask/*", "/face/x/mask/y/z"),
            Some(vec![
                ("0".to_owned(), "x".to_owned()),
                ("1".to_owned(), "y/z".to_owned())
            ])
        );
    }

    #[test]
    fn glob_fallback() {
        // No template match, but the glob applies
        assert_eq!(segments("face/**", "/face"), Some(Vec::new()));
        assert_eq!(segments("*.md", "/docs.txt"), None);
    }

    #[test]
    fn deserialization() {
        let patterns: Vec<PathPattern> = serde_yaml::from_str("[\"*.md\", \"face/:id\"]").unwrap();
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].as_str(), "*.md");
        assert!(patterns[1].captures("/face/1").is_some());
    }
}
