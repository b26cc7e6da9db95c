// store.rs — ChangeStore trait and JsonFileStore implementation.
//
// Change records outlive the process that generated them: a run records
// pending changes, and a later CLI invocation accepts or rejects them. The
// JSONL store appends one line per write; a later line for the same change id
// supersedes earlier ones, so resolving a change is a plain append.
//
// Layout: `<store_dir>/<project_id>.jsonl`.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use uuid::Uuid;

use crate::change::FileChange;
use crate::error::ChangeError;
use crate::project::validate_project_id;

/// Persistence for FileChange records, keyed by project.
pub trait ChangeStore: Send + Sync {
    /// Save a change. A record with the same id replaces the previous one.
    fn save(&self, project_id: &str, change: &FileChange) -> Result<(), ChangeError>;

    /// List the latest version of every change, in first-recorded order.
    fn list(&self, project_id: &str) -> Result<Vec<FileChange>, ChangeError>;

    /// Get the latest version of a specific change.
    fn get(&self, project_id: &str, id: Uuid) -> Result<Option<FileChange>, ChangeError> {
        Ok(self.list(project_id)?.into_iter().find(|c| c.id == id))
    }
}

/// JSON Lines file-based ChangeStore.
pub struct JsonFileStore {
    store_dir: PathBuf,
}

impl JsonFileStore {
    /// Create a new store backed by the given directory.
    /// Creates the directory if it doesn't exist.
    pub fn new(store_dir: impl AsRef<Path>) -> Result<Self, ChangeError> {
        let store_dir = store_dir.as_ref().to_path_buf();
        fs::create_dir_all(&store_dir).map_err(|source| ChangeError::IoError {
            path: store_dir.clone(),
            source,
        })?;
        Ok(Self { store_dir })
    }

    fn project_file(&self, project_id: &str) -> Result<PathBuf, ChangeError> {
        validate_project_id(project_id)?;
        Ok(self.store_dir.join(format!("{}.jsonl", project_id)))
    }

    /// Project ids that have at least one recorded change.
    pub fn projects(&self) -> Result<Vec<String>, ChangeError> {
        let entries = fs::read_dir(&self.store_dir).map_err(|source| ChangeError::IoError {
            path: self.store_dir.clone(),
            source,
        })?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ChangeError::IoError {
                path: self.store_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "jsonl") {
                if let Some(stem) = path.file_stem() {
                    ids.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

impl ChangeStore for JsonFileStore {
    fn save(&self, project_id: &str, change: &FileChange) -> Result<(), ChangeError> {
        let path = self.project_file(project_id)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| ChangeError::IoError {
                path: path.clone(),
                source,
            })?;

        let mut writer = BufWriter::new(file);
        let json = serde_json::to_string(change)?;
        writeln!(writer, "{}", json).map_err(|source| ChangeError::IoError {
            path: path.clone(),
            source,
        })?;
        writer
            .flush()
            .map_err(|source| ChangeError::IoError { path, source })?;

        Ok(())
    }

    fn list(&self, project_id: &str) -> Result<Vec<FileChange>, ChangeError> {
        let path = self.project_file(project_id)?;

        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path).map_err(|source| ChangeError::IoError {
            path: path.clone(),
            source,
        })?;

        let reader = BufReader::new(file);
        let mut order: Vec<Uuid> = Vec::new();
        let mut latest: HashMap<Uuid, FileChange> = HashMap::new();

        for line in reader.lines() {
            let line = line.map_err(|source| ChangeError::IoError {
                path: path.clone(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let change: FileChange = serde_json::from_str(&line)?;
            if !latest.contains_key(&change.id) {
                order.push(change.id);
            }
            latest.insert(change.id, change);
        }

        Ok(order
            .into_iter()
            .filter_map(|id| latest.remove(&id))
            .collect())
    }
}

/// In-memory ChangeStore for tests and one-shot runs.
#[derive(Default)]
pub struct MemoryChangeStore {
    changes: Mutex<HashMap<String, Vec<FileChange>>>,
}

impl MemoryChangeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChangeStore for MemoryChangeStore {
    fn save(&self, project_id: &str, change: &FileChange) -> Result<(), ChangeError> {
        let mut changes = self
            .changes
            .lock()
            .map_err(|e| ChangeError::ProjectStore(e.to_string()))?;
        let list = changes.entry(project_id.to_string()).or_default();
        match list.iter_mut().find(|c| c.id == change.id) {
            Some(existing) => *existing = change.clone(),
            None => list.push(change.clone()),
        }
        Ok(())
    }

    fn list(&self, project_id: &str) -> Result<Vec<FileChange>, ChangeError> {
        let changes = self
            .changes
            .lock()
            .map_err(|e| ChangeError::ProjectStore(e.to_string()))?;
        Ok(changes.get(project_id).cloned().unwrap_or_default())
    }
}
