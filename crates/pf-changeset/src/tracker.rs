// tracker.rs — ChangeTracker: records proposed changes and resolves them.
//
// The tracker owns the FileChange records of one project. It enforces the
// write-once review status, hands accepted content to the ProjectStore, and
// mirrors every record and resolution into an optional ChangeStore so review
// can continue in a later process.
//
// Bulk operations walk pending changes in ascending timestamp order. Each
// change resolves atomically on its own; a failure on one change does not
// roll back the others.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::change::{ChangeStatus, ChangeType, FileChange};
use crate::diff::FileDiff;
use crate::error::ChangeError;
use crate::project::{ProjectFile, ProjectStore};
use crate::store::ChangeStore;

/// Per-status counts for a tracker.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeCounts {
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// A change a bulk operation could not resolve.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchFailure {
    pub id: Uuid,
    pub file_path: String,
    pub error: String,
}

/// Result of `accept_all` / `reject_all`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Changes resolved, in the order they were finalized.
    pub resolved: Vec<Uuid>,
    pub failed: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct ChangeTracker {
    project_id: String,
    changes: Vec<FileChange>,
    store: Option<Arc<dyn ChangeStore>>,
    project_store: Option<Arc<dyn ProjectStore>>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl ChangeTracker {
    /// Create an empty tracker with no persistence attached.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            changes: Vec::new(),
            store: None,
            project_store: None,
            last_timestamp: None,
        }
    }

    /// Load a tracker from previously persisted records and keep writing to
    /// the same store.
    pub fn load(
        project_id: impl Into<String>,
        store: Arc<dyn ChangeStore>,
    ) -> Result<Self, ChangeError> {
        let project_id = project_id.into();
        let changes = store.list(&project_id)?;
        let last_timestamp = changes.iter().map(|c| c.timestamp).max();
        Ok(Self {
            project_id,
            changes,
            store: Some(store),
            project_store: None,
            last_timestamp,
        })
    }

    pub fn with_change_store(mut self, store: Arc<dyn ChangeStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_project_store(mut self, project_store: Arc<dyn ProjectStore>) -> Self {
        self.project_store = Some(project_store);
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Record new content for a path as a pending change.
    ///
    /// The change type is inferred: empty original is `created`, empty
    /// modified is `deleted`, anything else `modified`.
    pub fn record_change(
        &mut self,
        file_path: impl Into<String>,
        original_content: impl Into<String>,
        modified_content: impl Into<String>,
        description: Option<String>,
    ) -> Result<FileChange, ChangeError> {
        let timestamp = self.next_timestamp();
        let mut change = FileChange::new(file_path, original_content, modified_content, timestamp);
        change.description = description;

        if let Some(store) = &self.store {
            store.save(&self.project_id, &change)?;
        }

        tracing::info!(
            project_id = %self.project_id,
            change_id = %change.id,
            path = %change.file_path,
            change_type = %change.change_type,
            "change recorded"
        );

        self.last_timestamp = Some(timestamp);
        self.changes.push(change.clone());
        Ok(change)
    }

    pub fn get(&self, id: Uuid) -> Option<&FileChange> {
        self.changes.iter().find(|c| c.id == id)
    }

    /// All changes in recorded order.
    pub fn changes(&self) -> &[FileChange] {
        &self.changes
    }

    /// Pending changes in ascending timestamp order.
    pub fn pending(&self) -> Vec<&FileChange> {
        let mut pending: Vec<&FileChange> = self.changes.iter().filter(|c| c.is_pending()).collect();
        pending.sort_by_key(|c| c.timestamp);
        pending
    }

    pub fn has_pending(&self) -> bool {
        self.changes.iter().any(|c| c.is_pending())
    }

    pub fn counts(&self) -> ChangeCounts {
        let mut counts = ChangeCounts::default();
        for change in &self.changes {
            match change.status {
                ChangeStatus::Pending => counts.pending += 1,
                ChangeStatus::Accepted => counts.accepted += 1,
                ChangeStatus::Rejected => counts.rejected += 1,
            }
        }
        counts
    }

    /// Diff statistics for a change, computed fresh on every call.
    pub fn diff(&self, id: Uuid) -> Result<FileDiff, ChangeError> {
        self.get(id).map(FileChange::diff).ok_or(ChangeError::NotFound(id))
    }

    /// Accept a pending change and hand its content to the project store.
    ///
    /// The `accepted` record is persisted first. If the project write then
    /// fails, the change is put back to `pending`, so project content is only
    /// ever adopted for an accepted change.
    pub fn accept(&mut self, id: Uuid) -> Result<FileChange, ChangeError> {
        let index = self.pending_index(id)?;
        let previous = self.changes[index].clone();
        let accepted = self.finalize(index, ChangeStatus::Accepted)?;
        if let Err(e) = self.apply_to_project(&accepted) {
            self.revert(index, previous);
            return Err(e);
        }
        Ok(accepted)
    }

    /// Reject a pending change. The project store is not touched.
    pub fn reject(&mut self, id: Uuid) -> Result<FileChange, ChangeError> {
        let index = self.pending_index(id)?;
        self.finalize(index, ChangeStatus::Rejected)
    }

    /// Accept every pending change, oldest first.
    ///
    /// Statuses are persisted first; only changes whose `accepted` record was
    /// written reach the project store. Created and modified files go in one
    /// `save` call, deletions individually. A change whose project write
    /// fails is put back to `pending`.
    pub fn accept_all(&mut self) -> BatchOutcome {
        let mut results: Vec<(usize, Result<FileChange, String>)> = Vec::new();
        let mut previous: Vec<(usize, FileChange)> = Vec::new();
        for index in self.pending_order() {
            let before = self.changes[index].clone();
            let result = self
                .finalize(index, ChangeStatus::Accepted)
                .map_err(|e| e.to_string());
            if result.is_ok() {
                previous.push((index, before));
            }
            results.push((index, result));
        }

        let batch: Vec<ProjectFile> = previous
            .iter()
            .map(|(i, _)| &self.changes[*i])
            .filter(|c| c.change_type != ChangeType::Deleted)
            .map(|c| ProjectFile::completed(c.file_path.clone(), c.modified_content.clone()))
            .collect();
        let batch_result: Result<(), String> = match &self.project_store {
            Some(project_store) if !batch.is_empty() => project_store
                .save(&self.project_id, &batch)
                .map_err(|e| e.to_string()),
            _ => Ok(()),
        };

        for (index, before) in previous {
            let applied = if self.changes[index].change_type == ChangeType::Deleted {
                self.apply_to_project(&self.changes[index])
                    .map_err(|e| e.to_string())
            } else {
                batch_result.clone()
            };
            if let Err(error) = applied {
                self.revert(index, before);
                if let Some(slot) = results.iter_mut().find(|(i, _)| *i == index) {
                    slot.1 = Err(error);
                }
            }
        }

        let mut outcome = BatchOutcome::default();
        for (index, result) in results {
            self.push_outcome(&mut outcome, index, result);
        }
        tracing::info!(
            project_id = %self.project_id,
            resolved = outcome.resolved.len(),
            failed = outcome.failed.len(),
            "accept_all finished"
        );
        outcome
    }

    /// Reject every pending change, oldest first.
    pub fn reject_all(&mut self) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for index in self.pending_order() {
            let result = self
                .finalize(index, ChangeStatus::Rejected)
                .map_err(|e| e.to_string());
            self.push_outcome(&mut outcome, index, result);
        }
        tracing::info!(
            project_id = %self.project_id,
            resolved = outcome.resolved.len(),
            failed = outcome.failed.len(),
            "reject_all finished"
        );
        outcome
    }

    fn push_outcome(&self, outcome: &mut BatchOutcome, index: usize, result: Result<FileChange, String>) {
        let change = &self.changes[index];
        match result {
            Ok(_) => outcome.resolved.push(change.id),
            Err(error) => {
                tracing::warn!(change_id = %change.id, path = %change.file_path, %error, "change not resolved");
                outcome.failed.push(BatchFailure {
                    id: change.id,
                    file_path: change.file_path.clone(),
                    error,
                });
            }
        }
    }

    /// Indices of pending changes, ascending by timestamp.
    fn pending_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.changes.len())
            .filter(|&i| self.changes[i].is_pending())
            .collect();
        order.sort_by_key(|&i| (self.changes[i].timestamp, i));
        order
    }

    fn pending_index(&self, id: Uuid) -> Result<usize, ChangeError> {
        let index = self
            .changes
            .iter()
            .position(|c| c.id == id)
            .ok_or(ChangeError::NotFound(id))?;
        let status = self.changes[index].status;
        if status.is_resolved() {
            return Err(ChangeError::AlreadyResolved { id, status });
        }
        Ok(index)
    }

    fn apply_to_project(&self, change: &FileChange) -> Result<(), ChangeError> {
        let Some(project_store) = &self.project_store else {
            return Ok(());
        };
        match change.change_type {
            ChangeType::Deleted => {
                project_store.remove(&self.project_id, &change.file_path)?;
            }
            ChangeType::Created | ChangeType::Modified => {
                let file = ProjectFile::completed(
                    change.file_path.clone(),
                    change.modified_content.clone(),
                );
                project_store.save(&self.project_id, &[file])?;
            }
        }
        Ok(())
    }

    /// Persist the new status, then flip it in memory.
    fn finalize(&mut self, index: usize, status: ChangeStatus) -> Result<FileChange, ChangeError> {
        let mut updated = self.changes[index].clone();
        updated.status = status;
        if let Some(store) = &self.store {
            store.save(&self.project_id, &updated)?;
        }
        tracing::info!(
            project_id = %self.project_id,
            change_id = %updated.id,
            path = %updated.file_path,
            status = %status,
            "change resolved"
        );
        self.changes[index] = updated.clone();
        Ok(updated)
    }

    /// Put a change back to its earlier record after its project write failed.
    fn revert(&mut self, index: usize, previous: FileChange) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.project_id, &previous) {
                tracing::warn!(
                    change_id = %previous.id,
                    error = %e,
                    "could not restore pending record after failed project write"
                );
            }
        }
        tracing::warn!(
            project_id = %self.project_id,
            change_id = %previous.id,
            path = %previous.file_path,
            "project write failed; change left pending"
        );
        self.changes[index] = previous;
    }

    /// Wall-clock time, bumped forward if needed so timestamps stay unique.
    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::MemoryProjectStore;
    use crate::store::{JsonFileStore, MemoryChangeStore};
    use tempfile::tempdir;

    fn tracker_with_project() -> (ChangeTracker, Arc<MemoryProjectStore>) {
        let project = Arc::new(MemoryProjectStore::new());
        let tracker = ChangeTracker::new("proj").with_project_store(project.clone());
        (tracker, project)
    }

    #[test]
    fn record_change_is_pending_with_inferred_type() {
        let mut tracker = ChangeTracker::new("proj");
        let created = tracker.record_change("a.ts", "", "a", None).unwrap();
        let modified = tracker.record_change("b.ts", "old", "new", None).unwrap();
        let deleted = tracker
            .record_change("c.ts", "gone", "", Some("cleanup".to_string()))
            .unwrap();

        assert_eq!(created.change_type, ChangeType::Created);
        assert_eq!(modified.change_type, ChangeType::Modified);
        assert_eq!(deleted.change_type, ChangeType::Deleted);
        assert_eq!(deleted.description.as_deref(), Some("cleanup"));
        assert!(tracker.changes().iter().all(|c| c.is_pending()));
    }

    #[test]
    fn timestamps_strictly_increase() {
        let mut tracker = ChangeTracker::new("proj");
        let stamps: Vec<_> = (0..20)
            .map(|i| {
                tracker
                    .record_change(format!("f{}.ts", i), "", "x", None)
                    .unwrap()
                    .timestamp
            })
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn accept_then_reject_keeps_first_status() {
        let (mut tracker, _) = tracker_with_project();
        let change = tracker.record_change("a.ts", "", "a", None).unwrap();

        tracker.accept(change.id).unwrap();
        let result = tracker.reject(change.id);
        assert!(matches!(
            result,
            Err(ChangeError::AlreadyResolved {
                status: ChangeStatus::Accepted,
                ..
            })
        ));
        assert_eq!(tracker.get(change.id).unwrap().status, ChangeStatus::Accepted);
    }

    #[test]
    fn reject_then_accept_keeps_first_status() {
        let (mut tracker, project) = tracker_with_project();
        let change = tracker.record_change("a.ts", "", "a", None).unwrap();

        tracker.reject(change.id).unwrap();
        assert!(matches!(
            tracker.accept(change.id),
            Err(ChangeError::AlreadyResolved { .. })
        ));
        assert_eq!(tracker.get(change.id).unwrap().status, ChangeStatus::Rejected);
        assert!(project.save_calls().is_empty());
    }

    #[test]
    fn unknown_id_is_not_found() {
        let mut tracker = ChangeTracker::new("proj");
        let id = Uuid::new_v4();
        assert!(matches!(tracker.accept(id), Err(ChangeError::NotFound(_))));
        assert!(matches!(tracker.reject(id), Err(ChangeError::NotFound(_))));
        assert!(matches!(tracker.diff(id), Err(ChangeError::NotFound(_))));
    }

    #[test]
    fn accept_adopts_modified_content() {
        let (mut tracker, project) = tracker_with_project();
        let change = tracker.record_change("a.ts", "old", "new", None).unwrap();
        tracker.accept(change.id).unwrap();

        let files = project.load("proj").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content, "new");
    }

    #[test]
    fn accepting_deletion_removes_file() {
        let (mut tracker, project) = tracker_with_project();
        project
            .save("proj", &[ProjectFile::completed("old.ts", "x")])
            .unwrap();
        let change = tracker.record_change("old.ts", "x", "", None).unwrap();
        tracker.accept(change.id).unwrap();
        assert!(project.load("proj").unwrap().is_empty());
    }

    #[test]
    fn accept_all_saves_every_file_in_one_call() {
        let (mut tracker, project) = tracker_with_project();
        for name in ["a.ts", "b.ts", "c.ts"] {
            tracker
                .record_change(name, "", format!("// {}", name), None)
                .unwrap();
        }

        let outcome = tracker.accept_all();
        assert!(outcome.is_complete());
        assert_eq!(outcome.resolved.len(), 3);
        assert!(tracker
            .changes()
            .iter()
            .all(|c| c.status == ChangeStatus::Accepted));

        let calls = project.save_calls();
        assert_eq!(calls.len(), 1);
        let contents: Vec<&str> = calls[0].1.iter().map(|f| f.content.as_str()).collect();
        assert_eq!(contents, vec!["// a.ts", "// b.ts", "// c.ts"]);
    }

    #[test]
    fn bulk_operations_resolve_oldest_first_and_skip_resolved() {
        let mut tracker = ChangeTracker::new("proj");
        let first = tracker.record_change("a.ts", "", "a", None).unwrap();
        let second = tracker.record_change("b.ts", "", "b", None).unwrap();
        let third = tracker.record_change("c.ts", "", "c", None).unwrap();
        tracker.accept(second.id).unwrap();

        let outcome = tracker.reject_all();
        assert_eq!(outcome.resolved, vec![first.id, third.id]);
        assert_eq!(tracker.get(second.id).unwrap().status, ChangeStatus::Accepted);
        assert!(!tracker.has_pending());
        assert_eq!(
            tracker.counts(),
            ChangeCounts {
                pending: 0,
                accepted: 1,
                rejected: 2
            }
        );
    }

    #[test]
    fn diff_is_lazy_and_idempotent() {
        let mut tracker = ChangeTracker::new("proj");
        let change = tracker.record_change("a.ts", "a\nb\n", "a\nc\n", None).unwrap();
        let first = tracker.diff(change.id).unwrap();
        let second = tracker.diff(change.id).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.additions + first.deletions, first.changed_lines());
    }

    #[test]
    fn resolutions_survive_reload() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn ChangeStore> = Arc::new(JsonFileStore::new(dir.path()).unwrap());

        let (a, b) = {
            let mut tracker = ChangeTracker::new("proj").with_change_store(store.clone());
            let a = tracker.record_change("a.ts", "", "a", None).unwrap();
            let b = tracker.record_change("b.ts", "", "b", None).unwrap();
            tracker.reject(a.id).unwrap();
            (a, b)
        };

        let mut reloaded = ChangeTracker::load("proj", store).unwrap();
        assert_eq!(reloaded.get(a.id).unwrap().status, ChangeStatus::Rejected);
        assert_eq!(reloaded.pending().len(), 1);
        reloaded.accept(b.id).unwrap();
        let later = reloaded.record_change("c.ts", "", "c", None).unwrap();
        assert!(later.timestamp > b.timestamp);
    }

    /// Change store whose writes can be switched off mid-test.
    struct SwitchableStore {
        inner: MemoryChangeStore,
        failing: std::sync::atomic::AtomicBool,
    }

    impl SwitchableStore {
        fn new() -> Self {
            Self {
                inner: MemoryChangeStore::new(),
                failing: std::sync::atomic::AtomicBool::new(false),
            }
        }

        fn set_failing(&self, failing: bool) {
            self.failing
                .store(failing, std::sync::atomic::Ordering::SeqCst);
        }
    }

    impl ChangeStore for SwitchableStore {
        fn save(&self, project_id: &str, change: &FileChange) -> Result<(), ChangeError> {
            if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(ChangeError::ProjectStore("disk full".to_string()));
            }
            self.inner.save(project_id, change)
        }
        fn list(&self, project_id: &str) -> Result<Vec<FileChange>, ChangeError> {
            self.inner.list(project_id)
        }
    }

    /// Project store that refuses every write.
    struct ReadOnlyProject;

    impl ProjectStore for ReadOnlyProject {
        fn save(&self, _: &str, _: &[ProjectFile]) -> Result<(), ChangeError> {
            Err(ChangeError::ProjectStore("read-only".to_string()))
        }
        fn load(&self, _: &str) -> Result<Vec<ProjectFile>, ChangeError> {
            Ok(Vec::new())
        }
        fn remove(&self, _: &str, _: &str) -> Result<bool, ChangeError> {
            Err(ChangeError::ProjectStore("read-only".to_string()))
        }
    }

    #[test]
    fn failed_status_write_leaves_project_untouched() {
        let store = Arc::new(SwitchableStore::new());
        let project = Arc::new(MemoryProjectStore::new());
        project
            .save("proj", &[ProjectFile::completed("a.ts", "ORIGINAL")])
            .unwrap();
        let mut tracker = ChangeTracker::new("proj")
            .with_change_store(store.clone())
            .with_project_store(project.clone());
        let change = tracker
            .record_change("a.ts", "ORIGINAL", "PROPOSED", None)
            .unwrap();

        store.set_failing(true);
        assert!(tracker.accept(change.id).is_err());
        assert!(tracker.get(change.id).unwrap().is_pending());
        assert_eq!(project.load("proj").unwrap()[0].content, "ORIGINAL");

        store.set_failing(false);
        tracker.reject(change.id).unwrap();
        assert_eq!(project.load("proj").unwrap()[0].content, "ORIGINAL");
    }

    #[test]
    fn failed_status_write_keeps_change_out_of_batch() {
        let store = Arc::new(SwitchableStore::new());
        let project = Arc::new(MemoryProjectStore::new());
        let mut tracker = ChangeTracker::new("proj")
            .with_change_store(store.clone())
            .with_project_store(project.clone());
        tracker.record_change("a.ts", "", "a", None).unwrap();
        tracker.record_change("b.ts", "", "b", None).unwrap();

        store.set_failing(true);
        let outcome = tracker.accept_all();
        assert_eq!(outcome.failed.len(), 2);
        assert!(project.save_calls().is_empty());
        assert!(project.load("proj").unwrap().is_empty());
        assert_eq!(tracker.pending().len(), 2);
    }

    #[test]
    fn failed_project_write_puts_change_back_to_pending() {
        let store = Arc::new(MemoryChangeStore::new());
        let mut tracker = ChangeTracker::new("proj")
            .with_change_store(store.clone())
            .with_project_store(Arc::new(ReadOnlyProject));
        let change = tracker.record_change("a.ts", "", "a", None).unwrap();
        let other = tracker.record_change("b.ts", "x", "", None).unwrap();

        assert!(matches!(
            tracker.accept(change.id),
            Err(ChangeError::ProjectStore(_))
        ));
        assert!(tracker.get(change.id).unwrap().is_pending());
        assert!(store.get("proj", change.id).unwrap().unwrap().is_pending());

        let outcome = tracker.accept_all();
        assert!(outcome.resolved.is_empty());
        assert_eq!(outcome.failed.len(), 2);
        assert!(store.get("proj", other.id).unwrap().unwrap().is_pending());
        assert_eq!(tracker.counts().pending, 2);
    }

    #[test]
    fn failed_persist_leaves_change_pending() {
        struct FailingStore;
        impl ChangeStore for FailingStore {
            fn save(&self, _: &str, _: &FileChange) -> Result<(), ChangeError> {
                Err(ChangeError::ProjectStore("disk full".to_string()))
            }
            fn list(&self, _: &str) -> Result<Vec<FileChange>, ChangeError> {
                Ok(Vec::new())
            }
        }

        let memory = Arc::new(MemoryChangeStore::new());
        let mut tracker = ChangeTracker::new("proj").with_change_store(memory);
        let change = tracker.record_change("a.ts", "", "a", None).unwrap();

        tracker.store = Some(Arc::new(FailingStore));
        assert!(tracker.accept(change.id).is_err());
        assert!(tracker.get(change.id).unwrap().is_pending());

        let outcome = tracker.accept_all();
        assert_eq!(outcome.failed.len(), 1);
        assert!(outcome.resolved.is_empty());
    }
}
