// run.rs — GenerationRun: one prompt's journey from plan to reviewed changes.
//
// The state machine:
//   Idle → Planning → Resolving → Generating(0) → … → Generating(n-1)
//     → Reviewing → Idle
//   Planning, Resolving, or Generating → Failed | Cancelled
//
// Failed and Cancelled are terminal. A run that reaches Reviewing returns to
// Idle once every change it recorded has been accepted or rejected.

use std::fmt;

use chrono::{DateTime, Utc};
use pf_changeset::FileStatus;
use pf_plan::FileManifest;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RunError;

/// Pipeline step a failure happened in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStep {
    Planning,
    Resolving,
    Generating,
}

impl fmt::Display for RunStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStep::Planning => write!(f, "planning"),
            RunStep::Resolving => write!(f, "resolving"),
            RunStep::Generating => write!(f, "generating"),
        }
    }
}

/// Lifecycle state of a GenerationRun.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Planning,
    Resolving,
    /// Generating file `index` of `total` (zero-based).
    Generating { index: usize, total: usize },
    /// All files generated; changes await review.
    Reviewing,
    Failed { step: RunStep, reason: String },
    Cancelled,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Planning => write!(f, "planning"),
            RunState::Resolving => write!(f, "resolving"),
            RunState::Generating { .. } => write!(f, "generating"),
            RunState::Reviewing => write!(f, "reviewing"),
            RunState::Failed { .. } => write!(f, "failed"),
            RunState::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Failed { .. } | RunState::Cancelled)
    }

    /// True while planning or generating is underway.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunState::Planning | RunState::Resolving | RunState::Generating { .. }
        )
    }

    /// Check whether transitioning from this state to `next` is valid.
    pub fn can_transition_to(&self, next: &RunState) -> bool {
        if matches!(next, RunState::Failed { .. } | RunState::Cancelled) {
            return self.is_active();
        }

        match (self, next) {
            (RunState::Idle, RunState::Planning)
            | (RunState::Planning, RunState::Resolving)
            | (RunState::Reviewing, RunState::Idle) => true,
            (RunState::Resolving, RunState::Generating { index, total }) => {
                *index == 0 && *total > 0
            }
            (
                RunState::Generating { index, total },
                RunState::Generating {
                    index: next_index,
                    total: next_total,
                },
            ) => next_total == total && *next_index == index + 1 && next_index < next_total,
            (RunState::Generating { index, total }, RunState::Reviewing) => index + 1 == *total,
            _ => false,
        }
    }
}

/// One manifest file as tracked by a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    pub status: FileStatus,
}

/// The record of one generation prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRun {
    pub run_id: Uuid,

    /// User charged for the run.
    pub user_id: String,

    /// Project the generated files belong to.
    pub project_id: String,

    pub prompt: String,

    pub state: RunState,

    /// The accepted plan, once planning succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<FileManifest>,

    /// Generation order, once resolved.
    #[serde(default)]
    pub order: Vec<String>,

    /// Per-file status, in generation order.
    #[serde(default)]
    pub files: Vec<GeneratedFile>,

    /// FileChanges recorded by this run, in recording order.
    #[serde(default)]
    pub change_ids: Vec<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GenerationRun {
    /// Create a new run in the Idle state.
    pub fn new(
        user_id: impl Into<String>,
        project_id: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            user_id: user_id.into(),
            project_id: project_id.into(),
            prompt: prompt.into(),
            state: RunState::Idle,
            manifest: None,
            order: Vec::new(),
            files: Vec::new(),
            change_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition to a new state. Returns an error if the transition is invalid.
    pub fn transition(&mut self, new_state: RunState) -> Result<(), RunError> {
        if !self.state.can_transition_to(&new_state) {
            return Err(RunError::InvalidTransition {
                run_id: self.run_id,
                from: self.state.to_string(),
                to: new_state.to_string(),
            });
        }
        self.state = new_state;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Install the resolved order; every file starts `pending`.
    pub fn set_order(&mut self, order: Vec<String>) {
        self.files = order
            .iter()
            .map(|path| GeneratedFile {
                path: path.clone(),
                content: String::new(),
                status: FileStatus::Pending,
            })
            .collect();
        self.order = order;
    }

    pub fn file_mut(&mut self, path: &str) -> Option<&mut GeneratedFile> {
        self.files.iter_mut().find(|f| f.path == path)
    }

    /// Paths generated successfully, in generation order.
    pub fn completed_files(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Completed)
            .map(|f| f.path.clone())
            .collect()
    }
}
