// error.rs — Error types for planning, ordering, and generation.

use pf_completion::CompletionError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    /// Bad input, rejected before any completion request. Never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The completion service failed.
    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),

    /// The plan response was not a well-formed manifest.
    #[error("malformed plan: {0}")]
    MalformedPlan(String),

    /// The model returned nothing usable for a file.
    #[error("empty output for {path}")]
    EmptyOutput { path: String },

    /// The manifest's dependency graph has a cycle.
    #[error("dependency cycle: {}", .cycle.join(" -> "))]
    Cycle { cycle: Vec<String> },

    /// An entry depends on a path that is not in the manifest.
    #[error("{path} depends on unknown file {missing}")]
    UnknownDependency { path: String, missing: String },

    /// Two manifest entries share a path.
    #[error("duplicate manifest path: {0}")]
    DuplicatePath(String),
}

impl PlanError {
    /// True when repeating the same call might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PlanError::Completion(e) => e.is_retryable(),
            _ => false,
        }
    }
}
