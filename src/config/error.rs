//! Config merge error taxonomy

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A named source could not be resolved to an existing file.
    #[error("cannot find config {0}")]
    NotFound(String),

    #[error("error reading config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing config '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    /// A fragment's top-level value was not a mapping.
    #[error("invalid configuration in {path}: expected mapping, got {found}")]
    TopLevel { path: PathBuf, found: &'static str },

    /// A fragment key does not name a schema field.
    #[error("unknown config field '{path}'")]
    UnknownField { path: String },

    /// A value could not be assigned to its field, including the failed
    /// enum-name fallback for symbolic values.
    #[error("bad value for '{path}': expected {expected}, got {found}")]
    Assign {
        path: String,
        expected: &'static str,
        found: String,
    },

    /// A semantically invalid combination, such as `num_classes` with no
    /// detector variant selected.
    #[error("{0}")]
    Invalid(String),

    #[error("error writing config '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn unknown_field(parent: &str, name: &str) -> ConfigError {
        ConfigError::UnknownField {
            path: join_path(parent, name),
        }
    }

    pub(crate) fn assign(parent: &str, name: &str, expected: &'static str, found: String) -> ConfigError {
        ConfigError::Assign {
            path: join_path(parent, name),
            expected,
            found,
        }
    }
}

pub(crate) fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}
