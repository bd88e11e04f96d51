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

//! Deserialization helpers for configuration values that accept several shapes

use serde::de::{Deserialize, Deserializer, Error, SeqAccess, Visitor};
use std::fmt::Formatter;
use std::ops::Deref;

use crate::matcher::PathPattern;

/// A list setting that also accepts a single value.
///
/// `unlisted: .env` and `unlisted: [.env, .git]` both produce a list, the former with one
/// element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneOrMany<T>(Vec<T>);

impl<T> OneOrMany<T> {
    /// Returns the list of values.
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Deref for OneOrMany<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a, T> IntoIterator for &'a OneOrMany<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'de, T> Deserialize<'de> for OneOrMany<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Shape<T> {
            Many(Vec<T>),
            One(T),
        }

        Ok(match Shape::deserialize(deserializer)? {
            Shape::Many(list) => Self(list),
            Shape::One(value) => Self(vec![value]),
        })
    }
}

/// A setting that is either switched on or off globally or applies to matching paths only.
///
/// In configuration files this is either a boolean or a list of path patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathToggle {
    /// The setting applies to all paths (`true`) or none (`false`)
    All(bool),
    /// The setting applies to paths matching any of the patterns
    Matching(Vec<PathPattern>),
}

impl Default for PathToggle {
    fn default() -> Self {
        Self::All(true)
    }
}

impl From<bool> for PathToggle {
    fn from(value: bool) -> Self {
        Self::All(value)
    }
}

impl PathToggle {
    /// Checks whether the setting applies to the given path.
    pub fn applies(&self, path: &str) -> bool {
        match self {
            Self::All(value) => *value,
            Self::Matching(patterns) => patterns.iter().any(|pattern| pattern.is_match(path)),
        }
    }
}

impl<'de> Deserialize<'de> for PathToggle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ToggleVisitor;

        impl<'de> Visitor<'de> for ToggleVisitor {
            type Value = PathToggle;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a boolean or a list of path patterns")
            }

            fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
            where
                E: Error,
            {
                Ok(PathToggle::All(v))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                let pattern = PathPattern::new(v).map_err(E::custom)?;
                Ok(PathToggle::Matching(vec![pattern]))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut patterns = Vec::new();
                while let Some(pattern) = seq.next_element()? {
                    patterns.push(pattern);
                }
                Ok(PathToggle::Matching(patterns))
            }
        }

        deserializer.deserialize_any(ToggleVisitor)
    }
}

/// Deserializes a header value that might be given as a string, a number, a boolean or `null`.
///
/// Numbers and booleans are converted to their string representation, `null` produces `None`.
pub fn deserialize_nullable_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct NullableVisitor;

    impl<'de> Visitor<'de> for NullableVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string, a number or null")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(Some(v.to_owned()))
        }

        fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(Some(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(Some(v.to_string()))
        }

        fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(Some(v.to_string()))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(None)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(NullableVisitor)
}
