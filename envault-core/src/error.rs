//! Error types for envault-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing persisted configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file exists but is not valid JSON for [`crate::SyncConfig`].
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error (save path).
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
