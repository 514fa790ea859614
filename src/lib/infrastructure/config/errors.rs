//! Configuration errors

use std::{io, path::PathBuf};

use thiserror::Error;

/// The content of a config file could not be (de)serialized
#[derive(Debug, Error)]
pub enum ParseError {
    /// YAML error
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// XML error
    #[error(transparent)]
    Xml(#[from] quick_xml::de::DeError),
}

/// Errors raised while loading or writing a config file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file is missing, unreadable or unwritable
    #[error("could not access config file {path:?}: {source}")]
    File {
        /// Path of the config file
        path: PathBuf,
        /// Underlying io error
        #[source]
        source: io::Error,
    },

    /// The file content does not match the config schema
    #[error("invalid config file {path:?}: {source}")]
    Parse {
        /// Path of the config file
        path: PathBuf,
        /// Underlying parser error
        #[source]
        source: ParseError,
    },

    /// The config could not be turned into text
    #[error("could not serialize config: {0}")]
    Serialize(#[source] ParseError),
}
