// error.rs — Error types for the generation run subsystem.

use std::path::PathBuf;

use pf_changeset::ChangeError;
use pf_plan::PlanError;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while starting, running, or reviewing a generation.
#[derive(Debug, Error)]
pub enum RunError {
    /// The credit gate refused the request. No completion call was made.
    #[error("insufficient credits for {user_id}: {required} required")]
    InsufficientCredits { user_id: String, required: u64 },

    /// Planning, ordering, or generation failed.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Recording or resolving a change failed.
    #[error(transparent)]
    Change(#[from] ChangeError),

    /// The project store could not be read or written.
    #[error("project store error: {0}")]
    Project(#[source] ChangeError),

    /// The credit ledger could not be read or written.
    #[error("credit ledger error: {0}")]
    Ledger(String),

    /// The requested run was not found.
    #[error("run not found: {0}")]
    NotFound(Uuid),

    /// Invalid state transition.
    #[error("invalid transition from {from} to {to} for run {run_id}")]
    InvalidTransition {
        run_id: Uuid,
        from: String,
        to: String,
    },

    /// Review cannot finish while changes are still pending.
    #[error("run {run_id} still has {pending} pending change(s)")]
    ReviewPending { run_id: Uuid, pending: usize },

    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize or deserialize run data.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// forge.toml could not be parsed.
    #[error("invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },
}
