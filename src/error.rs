//! Error types
//!
//! Backend failures never cross the worker/consumer boundary as panics; they
//! travel as these values inside outcomes or are logged.

use crate::snapshot::FileIdentity;

/// Failures reported by a parse backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The backend could not be constructed (bad arguments, unsupported file)
    #[error("parse backend unavailable: {0}")]
    Unavailable(String),

    /// A single reparse cycle failed; the previous parse state is kept
    #[error("reparse of {file} failed: {reason}")]
    ReparseFailed { file: FileIdentity, reason: String },

    #[error("completion failed: {0}")]
    CompletionFailed(String),
}

/// Failures of the coordinator itself
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// The backend was torn down; no further access is possible
    #[error("parse coordinator has shut down")]
    ShutDown,

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("failed to spawn parse worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Failures opening a source view
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
}
