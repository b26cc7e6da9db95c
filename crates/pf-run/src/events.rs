// events.rs — Progress events and the run log.
//
// Two audiences watch a run:
// - The presentation layer consumes `ProgressEvent`s from a stream, one per
//   plan, file, and run outcome.
// - Operators read the run log: one timestamped line per state transition,
//   fanned out to every configured `LogSink`.
//
// Sink errors are reported through tracing and never stop a run.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use pf_changeset::FileChange;
use pf_plan::FileManifest;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RunError;
use crate::orchestrator::RunFailure;

/// Events emitted while a generation run progresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// The plan was accepted and ordered.
    PlanReady {
        run_id: Uuid,
        manifest: FileManifest,
        order: Vec<String>,
    },

    /// Generation of one file began.
    FileStarted {
        run_id: Uuid,
        path: String,
        index: usize,
        total: usize,
    },

    /// A file was generated and recorded as a pending change.
    FileCompleted {
        run_id: Uuid,
        path: String,
        change: FileChange,
    },

    /// A file could not be generated. The run stops here.
    FileFailed {
        run_id: Uuid,
        path: String,
        error: String,
    },

    /// Every file was generated; these changes await review.
    RunCompleted {
        run_id: Uuid,
        changes: Vec<FileChange>,
    },

    /// The run stopped at a failed step.
    RunFailed { run_id: Uuid, failure: RunFailure },

    /// The run was cancelled between files.
    RunCancelled {
        run_id: Uuid,
        completed_files: Vec<String>,
    },

    /// The request was refused before the run started (validation, credits)
    /// or the run stopped on a storage error.
    Aborted { message: String },
}

impl ProgressEvent {
    /// Get the event type name as a string.
    pub fn event_type(&self) -> &str {
        match self {
            ProgressEvent::PlanReady { .. } => "plan_ready",
            ProgressEvent::FileStarted { .. } => "file_started",
            ProgressEvent::FileCompleted { .. } => "file_completed",
            ProgressEvent::FileFailed { .. } => "file_failed",
            ProgressEvent::RunCompleted { .. } => "run_completed",
            ProgressEvent::RunFailed { .. } => "run_failed",
            ProgressEvent::RunCancelled { .. } => "run_cancelled",
            ProgressEvent::Aborted { .. } => "aborted",
        }
    }

    /// True for the last event a run emits.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            ProgressEvent::RunCompleted { .. }
                | ProgressEvent::RunFailed { .. }
                | ProgressEvent::RunCancelled { .. }
                | ProgressEvent::Aborted { .. }
        )
    }
}

/// Receives timestamped run log lines.
pub trait LogSink: Send + Sync {
    fn log(&self, timestamp: DateTime<Utc>, message: &str) -> Result<(), RunError>;
}

/// Forwards log lines to `tracing` at info level.
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, timestamp: DateTime<Utc>, message: &str) -> Result<(), RunError> {
        tracing::info!(at = %timestamp.to_rfc3339(), "{}", message);
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct LogLine {
    timestamp: DateTime<Utc>,
    message: String,
}

/// Appends `{timestamp, message}` JSONL records to a file.
pub struct JsonlLogSink {
    path: PathBuf,
}

impl JsonlLogSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for JsonlLogSink {
    fn log(&self, timestamp: DateTime<Utc>, message: &str) -> Result<(), RunError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| RunError::IoError {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| RunError::IoError {
                path: self.path.clone(),
                source,
            })?;

        let json = serde_json::to_string(&LogLine {
            timestamp,
            message: message.to_string(),
        })?;
        writeln!(file, "{}", json).map_err(|source| RunError::IoError {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }
}

/// Keeps log lines in memory. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemoryLogSink {
    lines: Arc<Mutex<Vec<(DateTime<Utc>, String)>>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(DateTime<Utc>, String)> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lines().into_iter().map(|(_, m)| m).collect()
    }
}

impl LogSink for MemoryLogSink {
    fn log(&self, timestamp: DateTime<Utc>, message: &str) -> Result<(), RunError> {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((timestamp, message.to_string()));
        }
        Ok(())
    }
}

/// Dispatches log lines to multiple sinks.
///
/// Errors from individual sinks are logged (via tracing) but don't
/// prevent other sinks from receiving the line.
pub struct LogDispatcher {
    sinks: Vec<Box<dyn LogSink>>,
}

impl LogDispatcher {
    /// Create a dispatcher with no sinks.
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: Box<dyn LogSink>) {
        self.sinks.push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Stamp `message` with the current time and send it to every sink.
    pub fn log(&self, message: &str) {
        let now = Utc::now();
        for sink in &self.sinks {
            if let Err(e) = sink.log(now, message) {
                tracing::warn!("run log sink error: {}", e);
            }
        }
    }
}

impl Default for LogDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
