// store.rs — RunStore: persistence for GenerationRun records.
//
// Each run is stored as a JSON file: `<store_dir>/<run_id>.json`, rewritten
// on every state transition.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::RunError;
use crate::run::GenerationRun;

pub struct RunStore {
    store_dir: PathBuf,
}

impl RunStore {
    /// Create a new store backed by the given directory.
    /// Creates the directory if it doesn't exist.
    pub fn new(store_dir: impl AsRef<Path>) -> Result<Self, RunError> {
        let store_dir = store_dir.as_ref().to_path_buf();
        fs::create_dir_all(&store_dir).map_err(|source| RunError::IoError {
            path: store_dir.clone(),
            source,
        })?;
        Ok(Self { store_dir })
    }

    /// Save a run (creates or overwrites).
    pub fn save(&self, run: &GenerationRun) -> Result<(), RunError> {
        let path = self.run_file(run.run_id);
        let json = serde_json::to_string_pretty(run)?;
        fs::write(&path, json).map_err(|source| RunError::IoError { path, source })
    }

    pub fn get(&self, run_id: Uuid) -> Result<Option<GenerationRun>, RunError> {
        let path = self.run_file(run_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|source| RunError::IoError {
            path: path.clone(),
            source,
        })?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// List all runs, newest first. Unreadable files are skipped.
    pub fn list(&self) -> Result<Vec<GenerationRun>, RunError> {
        let entries = fs::read_dir(&self.store_dir).map_err(|source| RunError::IoError {
            path: self.store_dir.clone(),
            source,
        })?;

        let mut runs = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| RunError::IoError {
                    path: self.store_dir.clone(),
                    source,
                })?
                .path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            let json = fs::read_to_string(&path).map_err(|source| RunError::IoError {
                path: path.clone(),
                source,
            })?;
            match serde_json::from_str::<GenerationRun>(&json) {
                Ok(run) => runs.push(run),
                Err(e) => tracing::warn!(path = %path.display(), "skipping unreadable run: {}", e),
            }
        }

        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(runs)
    }

    /// Runs that generated into `project_id`, newest first.
    pub fn list_for_project(&self, project_id: &str) -> Result<Vec<GenerationRun>, RunError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.project_id == project_id)
            .collect())
    }

    fn run_file(&self, run_id: Uuid) -> PathBuf {
        self.store_dir.join(format!("{}.json", run_id))
    }
}
