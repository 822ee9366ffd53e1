//! Error types for envault-sync.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use envault_core::ConfigError;

/// Which orchestrator flow an error surfaced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// First-time setup with server, environment and setup token.
    Setup,
    /// Subsequent pull using the persisted config.
    Pull,
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Setup => write!(f, "Initialization"),
            Flow::Pull => write!(f, "Pull"),
        }
    }
}

/// Failures reported by a [`crate::remote::Remote`] or
/// [`crate::remote::FileSource`] implementation.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The setup token was rejected or has expired.
    #[error("Looks like your setup token is invalid, please get another!")]
    InvalidSetupToken,

    /// The stored auth token no longer opens a session.
    #[error("There is an error with your Envault configuration, please set up your app again!")]
    InvalidSession,

    /// The server answered with a non-success status.
    #[error("server responded with HTTP {status}")]
    Status { status: u16 },

    /// Connection, TLS, decoding or stream failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// All errors that can abort a sync run.
///
/// Per-file download failures are not errors of the run; they are collected
/// in [`crate::SyncReport::failed`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// Reading or writing the persisted config failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The remote handshake or update call failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A pull was requested but no config has been written yet.
    #[error("Please initialize your Envault environment before trying to pull.")]
    NotInitialized,

    /// The env file was missing and the user declined to create it.
    #[error("{flow} aborted as a {filename} file was not found.")]
    EnvFileDeclined { flow: Flow, filename: String },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
