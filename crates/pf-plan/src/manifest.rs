// manifest.rs — The file manifest produced by planning.

use serde::{Deserialize, Serialize};

/// One file the plan wants generated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileManifestEntry {
    /// Project-relative path, unique within the manifest.
    pub path: String,

    /// What the file should contain; steers generation.
    pub description: String,

    /// Paths that must be generated before this one, in declared order.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl FileManifestEntry {
    pub fn new(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            description: description.into(),
            dependencies: Vec::new(),
        }
    }

    /// Add a dependency and return self (builder pattern).
    pub fn depends_on(mut self, path: impl Into<String>) -> Self {
        self.dependencies.push(path.into());
        self
    }
}

/// A complete plan: project name plus the files to generate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileManifest {
    pub project_name: String,
    pub files: Vec<FileManifestEntry>,
}

impl FileManifest {
    pub fn entry(&self, path: &str) -> Option<&FileManifestEntry> {
        self.files.iter().find(|e| e.path == path)
    }

    /// Paths in declaration order.
    pub fn paths(&self) -> Vec<&str> {
        self.files.iter().map(|e| e.path.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
