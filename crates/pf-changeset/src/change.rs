// change.rs — FileChange: one reviewable proposed file mutation.
//
// Every time generation or a modification request produces new content for a
// path, the result is wrapped in a FileChange. The change sits in `pending`
// until a reviewer accepts or rejects it; that resolution happens exactly once.
//
//   Pending → Accepted   (terminal)
//   Pending → Rejected   (terminal)

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::diff::{self, FileDiff};

/// What kind of mutation a change applies to its path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    Modified,
    Deleted,
}

impl ChangeType {
    /// Infer the change type from the content pair.
    ///
    /// Empty original means the file is new; empty modified means it goes away.
    pub fn infer(original: &str, modified: &str) -> Self {
        if original.is_empty() {
            ChangeType::Created
        } else if modified.is_empty() {
            ChangeType::Deleted
        } else {
            ChangeType::Modified
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeType::Created => write!(f, "created"),
            ChangeType::Modified => write!(f, "modified"),
            ChangeType::Deleted => write!(f, "deleted"),
        }
    }
}

/// Review status of a change. Leaves `Pending` at most once.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ChangeStatus {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, ChangeStatus::Pending)
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeStatus::Pending => write!(f, "pending"),
            ChangeStatus::Accepted => write!(f, "accepted"),
            ChangeStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// A single proposed file mutation awaiting (or past) review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileChange {
    /// Unique identifier for this change.
    pub id: Uuid,

    /// Project-relative path of the affected file.
    pub file_path: String,

    /// Content before the change ("" for a new file).
    pub original_content: String,

    /// Proposed content ("" when the file is being deleted).
    pub modified_content: String,

    pub change_type: ChangeType,

    pub status: ChangeStatus,

    /// When the change was recorded. Unique and increasing within a tracker.
    pub timestamp: DateTime<Utc>,

    /// Optional human-readable reason for the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// SHA-256 of `modified_content`, hex encoded.
    pub content_hash: String,
}

impl FileChange {
    /// Create a pending change, inferring its type from the content pair.
    pub fn new(
        file_path: impl Into<String>,
        original_content: impl Into<String>,
        modified_content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let original_content = original_content.into();
        let modified_content = modified_content.into();
        let change_type = ChangeType::infer(&original_content, &modified_content);
        let content_hash = compute_content_hash(&modified_content);
        Self {
            id: Uuid::new_v4(),
            file_path: file_path.into(),
            original_content,
            modified_content,
            change_type,
            status: ChangeStatus::Pending,
            timestamp,
            description: None,
            content_hash,
        }
    }

    /// Attach a description and return self (builder pattern).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == ChangeStatus::Pending
    }

    /// Diff of original → modified, recomputed on every call.
    pub fn diff(&self) -> FileDiff {
        diff::diff(&self.original_content, &self.modified_content)
    }

    /// Verify the stored hash still matches the modified content.
    pub fn verify_hash(&self) -> bool {
        self.content_hash == compute_content_hash(&self.modified_content)
    }
}

fn compute_content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
