// error.rs — Error types for the change-tracking subsystem.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::change::ChangeStatus;

/// Errors that can occur while recording or resolving changes.
#[derive(Debug, Error)]
pub enum ChangeError {
    /// No change with this id is tracked.
    #[error("change not found: {0}")]
    NotFound(Uuid),

    /// The change already left `pending`; status is write-once.
    #[error("change {id} is already {status}")]
    AlreadyResolved { id: Uuid, status: ChangeStatus },

    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize or deserialize a change record.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A file path would resolve outside the project directory.
    #[error("path traversal detected: '{path}' resolves outside project directory")]
    PathTraversal { path: String },

    /// The project store refused the accepted content.
    #[error("project store error: {0}")]
    ProjectStore(String),
}
