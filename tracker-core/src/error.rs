//! Error types for tracker-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from repository list operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse repository list at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`; cannot locate `~/.tracker/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    #[error("repository '{name}' is already registered")]
    DuplicateRepository { name: String },

    #[error("repository '{name}' not found")]
    RepositoryNotFound { name: String },
}

/// Errors from loading or validating [`crate::config::TrackerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {field} must be greater than zero")]
    Invalid { field: &'static str },

    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}
