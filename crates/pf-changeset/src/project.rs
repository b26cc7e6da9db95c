// project.rs — ProjectStore: where accepted file content ends up.
//
// Accepting a change hands its content to the project store, which owns the
// project's durable file set. Two implementations are provided: a directory
// store that writes real files (one subdirectory per project) and an
// in-memory store for tests and ephemeral runs.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::ChangeError;

/// Lifecycle status of a file's content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    Generating,
    Completed,
    Error,
}

impl FileStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStatus::Completed | FileStatus::Error)
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Pending => write!(f, "pending"),
            FileStatus::Generating => write!(f, "generating"),
            FileStatus::Completed => write!(f, "completed"),
            FileStatus::Error => write!(f, "error"),
        }
    }
}

/// One file as persisted by a project store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectFile {
    pub path: String,
    pub content: String,
    pub status: FileStatus,
}

impl ProjectFile {
    pub fn completed(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            status: FileStatus::Completed,
        }
    }
}

/// Durable keyed storage for a project's files.
pub trait ProjectStore: Send + Sync {
    /// Persist (create or overwrite) the given files.
    fn save(&self, project_id: &str, files: &[ProjectFile]) -> Result<(), ChangeError>;

    /// Load every file of a project, sorted by path.
    fn load(&self, project_id: &str) -> Result<Vec<ProjectFile>, ChangeError>;

    /// Remove a file. Returns false if it did not exist.
    fn remove(&self, project_id: &str, path: &str) -> Result<bool, ChangeError>;
}

/// Reject project ids that are not a single plain path segment.
///
/// Stores join the id onto their root, so `..`, absolute paths and nested
/// segments would land outside it.
pub fn validate_project_id(project_id: &str) -> Result<(), ChangeError> {
    let mut components = Path::new(project_id).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(ChangeError::PathTraversal {
            path: project_id.to_string(),
        }),
    }
}

/// Stores each project as a plain directory tree: `<root>/<project_id>/<path>`.
pub struct DirProjectStore {
    root: PathBuf,
}

impl DirProjectStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ChangeError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| ChangeError::IoError {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn project_dir(&self, project_id: &str) -> Result<PathBuf, ChangeError> {
        validate_project_id(project_id)?;
        Ok(self.root.join(project_id))
    }

    fn resolve_path(&self, project_id: &str, relative_path: &str) -> Result<PathBuf, ChangeError> {
        let rel = Path::new(relative_path);
        let escapes = rel.is_absolute()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative_path.is_empty() {
            return Err(ChangeError::PathTraversal {
                path: relative_path.to_string(),
            });
        }
        Ok(self.project_dir(project_id)?.join(rel))
    }

    fn walk(&self, dir: &Path, base: &Path, out: &mut Vec<ProjectFile>) -> Result<(), ChangeError> {
        let entries = fs::read_dir(dir).map_err(|source| ChangeError::IoError {
            path: dir.to_path_buf(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| ChangeError::IoError {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_dir() {
                self.walk(&path, base, out)?;
                continue;
            }
            let content = fs::read_to_string(&path).map_err(|source| ChangeError::IoError {
                path: path.clone(),
                source,
            })?;
            let relative = path
                .strip_prefix(base)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            out.push(ProjectFile::completed(relative, content));
        }
        Ok(())
    }
}

impl ProjectStore for DirProjectStore {
    fn save(&self, project_id: &str, files: &[ProjectFile]) -> Result<(), ChangeError> {
        for file in files {
            let full_path = self.resolve_path(project_id, &file.path)?;
            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent).map_err(|source| ChangeError::IoError {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            fs::write(&full_path, &file.content).map_err(|source| ChangeError::IoError {
                path: full_path.clone(),
                source,
            })?;
        }
        tracing::debug!(project_id, count = files.len(), "saved project files");
        Ok(())
    }

    fn load(&self, project_id: &str) -> Result<Vec<ProjectFile>, ChangeError> {
        let dir = self.project_dir(project_id)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        self.walk(&dir, &dir, &mut files)?;
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn remove(&self, project_id: &str, path: &str) -> Result<bool, ChangeError> {
        let full_path = self.resolve_path(project_id, path)?;
        if !full_path.exists() {
            return Ok(false);
        }
        fs::remove_file(&full_path).map_err(|source| ChangeError::IoError {
            path: full_path,
            source,
        })?;
        Ok(true)
    }
}

/// In-memory project store. Also records every `save` call for inspection.
#[derive(Default)]
pub struct MemoryProjectStore {
    projects: Mutex<BTreeMap<String, BTreeMap<String, ProjectFile>>>,
    saves: Mutex<Vec<(String, Vec<ProjectFile>)>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `save` call received so far, oldest first.
    pub fn save_calls(&self) -> Vec<(String, Vec<ProjectFile>)> {
        self.saves.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl ProjectStore for MemoryProjectStore {
    fn save(&self, project_id: &str, files: &[ProjectFile]) -> Result<(), ChangeError> {
        let mut projects = self
            .projects
            .lock()
            .map_err(|e| ChangeError::ProjectStore(e.to_string()))?;
        let project = projects.entry(project_id.to_string()).or_default();
        for file in files {
            project.insert(file.path.clone(), file.clone());
        }
        if let Ok(mut saves) = self.saves.lock() {
            saves.push((project_id.to_string(), files.to_vec()));
        }
        Ok(())
    }

    fn load(&self, project_id: &str) -> Result<Vec<ProjectFile>, ChangeError> {
        let projects = self
            .projects
            .lock()
            .map_err(|e| ChangeError::ProjectStore(e.to_string()))?;
        Ok(projects
            .get(project_id)
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default())
    }

    fn remove(&self, project_id: &str, path: &str) -> Result<bool, ChangeError> {
        let mut projects = self
            .projects
            .lock()
            .map_err(|e| ChangeError::ProjectStore(e.to_string()))?;
        Ok(projects
            .get_mut(project_id)
            .and_then(|p| p.remove(path))
            .is_some())
    }
}
