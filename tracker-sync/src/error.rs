//! Error types for tracker-sync.

use std::path::PathBuf;

use thiserror::Error;

use tracker_core::types::RepositoryKind;
use tracker_core::RegistryError;

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the repository list.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Index manifest could not be parsed.
    #[error("failed to parse index from {location}: {source}")]
    IndexParse {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Remote index could not be fetched.
    #[error("HTTP error fetching {url}: {message}")]
    Http { url: String, message: String },

    /// JSON serialization/deserialization error (catalog store).
    #[error("catalog JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("repository kind '{0}' is not supported by this loader")]
    UnsupportedKind(RepositoryKind),

    #[error("run cancelled")]
    Cancelled,

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("task join error: {0}")]
    Join(String),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
