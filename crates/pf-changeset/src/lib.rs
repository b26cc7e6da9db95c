//! # pf-changeset
//!
//! The reviewable-change data model for PromptForge.
//!
//! Every file mutation produced by generation or by a modification prompt is a
//! [`FileChange`]: a pending proposal with an original/modified content pair.
//! A reviewer resolves each change exactly once, accepting it into the
//! project or rejecting it.
//!
//! ## Key components
//!
//! - [`diff()`] — positional line diff producing a [`FileDiff`]
//! - [`FileChange`] — one proposed mutation with write-once review status
//! - [`ChangeTracker`] — records changes, per-change and bulk accept/reject
//! - [`ChangeStore`] — persistence for change records ([`JsonFileStore`])
//! - [`ProjectStore`] — receives accepted content ([`DirProjectStore`])

pub mod change;
pub mod diff;
pub mod error;
pub mod project;
pub mod store;
pub mod tracker;

pub use change::{ChangeStatus, ChangeType, FileChange};
pub use diff::{diff, DiffChunk, DiffLine, DiffLineKind, FileDiff};
pub use error::ChangeError;
pub use project::{
    validate_project_id, DirProjectStore, FileStatus, MemoryProjectStore, ProjectFile,
    ProjectStore,
};
pub use store::{ChangeStore, JsonFileStore, MemoryChangeStore};
pub use tracker::{BatchFailure, BatchOutcome, ChangeCounts, ChangeTracker};
