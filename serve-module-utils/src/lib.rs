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

//! # Module helpers
//!
//! This crate contains helpers shared by `rewrite-module`, `headers-module` and
//! `static-files-module`: matching request paths against configured patterns, deserializing
//! configuration files, the response sink abstraction and standard responses.

pub mod deserialize;
pub mod matcher;
pub mod response;
pub mod standard_response;

use log::trace;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub use deserialize::{OneOrMany, PathToggle};
pub use matcher::{PathMatch, PathPattern};
pub use response::{ByteStream, ResponseSink, TestResponse};

/// Errors produced when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file could not be opened
    #[error("failed opening configuration file {path:?}: {source}")]
    Open {
        /// Location of the configuration file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Configuration data is invalid
    #[error("failed reading configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Trait for configuration structures that can be loaded from YAML data.
pub trait FromYaml {
    /// Parses configuration from a YAML string.
    fn from_yaml(data: &str) -> Result<Self, ConfigError>
    where
        Self: Sized;

    /// Loads configuration from a YAML file.
    fn load_from_yaml<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        Self: Sized;
}

impl<D> FromYaml for D
where
    D: DeserializeOwned + Debug,
{
    fn from_yaml(data: &str) -> Result<Self, ConfigError> {
        let conf = serde_yaml::from_str(data)?;
        trace!("Parsed configuration: {conf:#?}");
        Ok(conf)
    }

    fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path.as_ref()).map_err(|source| ConfigError::Open {
            path: path.as_ref().to_owned(),
            source,
        })?;
        let reader = BufReader::new(file);

        let conf = serde_yaml::from_reader(reader)?;
        trace!("Loaded configuration file: {conf:#?}");

        Ok(conf)
    }
}
