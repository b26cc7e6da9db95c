// orchestrator.rs — GenerationOrchestrator: drives one prompt through the
// pipeline.
//
//   credit gate → plan → resolve order → generate each file → review
//
// Generation is strictly sequential; completion calls are the only await
// points that do real work. Each generated file is recorded as a pending
// FileChange the moment it completes, so a failure or cancellation part way
// through keeps everything produced before it. Every state transition is
// persisted to the RunStore and written to the run log.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pf_changeset::{
    ChangeStore, ChangeTracker, DirProjectStore, FileChange, FileStatus, JsonFileStore,
    ProjectStore,
};
use pf_completion::TextCompletionProvider;
use pf_plan::{resolve, FileGenerator, FileManifestEntry, PlanBuilder, PlanError, PlanSettings};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::config::{ForgeConfig, ForgeSettings};
use crate::error::RunError;
use crate::events::{JsonlLogSink, LogDispatcher, LogSink, ProgressEvent, TracingLogSink};
use crate::ledger::{CreditLedger, JsonCreditLedger};
use crate::retry::RetryPolicy;
use crate::run::{GenerationRun, RunState, RunStep};
use crate::store::RunStore;

/// Cooperative cancellation, checked between files. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A generation prompt and who it is for.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub user_id: String,
    /// Target project. A fresh project named after the run id when absent.
    pub project_id: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            user_id: user_id.into(),
            project_id: None,
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }
}

/// A request to rewrite one existing project file.
#[derive(Debug, Clone)]
pub struct ModifyRequest {
    pub project_id: String,
    pub path: String,
    pub instruction: String,
    pub user_id: String,
}

/// Why and where a run stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunFailure {
    pub step: RunStep,
    /// The file being generated, for generation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
    /// Whether resubmitting the same prompt might succeed.
    pub retryable: bool,
    /// Files generated (and recorded) before the failure.
    pub completed_files: Vec<String>,
}

/// Outcome of an awaited run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run: GenerationRun,
    /// Changes this run recorded, in generation order.
    pub changes: Vec<FileChange>,
    pub failure: Option<RunFailure>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.run.state == RunState::Reviewing
    }

    pub fn is_cancelled(&self) -> bool {
        self.run.state == RunState::Cancelled
    }
}

/// Stores and ledger the orchestrator works against.
pub struct Collaborators {
    pub ledger: Arc<dyn CreditLedger>,
    pub change_store: Arc<dyn ChangeStore>,
    pub project_store: Arc<dyn ProjectStore>,
    pub runs: RunStore,
}

impl Collaborators {
    /// File-backed collaborators laid out by `config`.
    pub fn from_config(config: &ForgeConfig) -> Result<Self, RunError> {
        Ok(Self {
            ledger: Arc::new(JsonCreditLedger::new(&config.credits_file)),
            change_store: Arc::new(JsonFileStore::new(&config.changes_dir)?),
            project_store: Arc::new(
                DirProjectStore::new(&config.projects_dir).map_err(RunError::Project)?,
            ),
            runs: RunStore::new(&config.runs_dir)?,
        })
    }

    /// Return a reviewed run to `idle`. Fails while any of its changes is
    /// still pending. Needs no completion provider.
    pub fn finish_review(
        &self,
        run_id: Uuid,
        log: &LogDispatcher,
    ) -> Result<GenerationRun, RunError> {
        close_review(&self.runs, self.change_store.as_ref(), log, run_id)
    }
}

fn close_review(
    runs: &RunStore,
    change_store: &dyn ChangeStore,
    log: &LogDispatcher,
    run_id: Uuid,
) -> Result<GenerationRun, RunError> {
    let mut run = runs.get(run_id)?.ok_or(RunError::NotFound(run_id))?;
    let changes = change_store.list(&run.project_id)?;
    let pending = run
        .change_ids
        .iter()
        .filter(|id| changes.iter().any(|c| c.id == **id && c.is_pending()))
        .count();
    if pending > 0 {
        return Err(RunError::ReviewPending { run_id, pending });
    }
    let from = run.state.to_string();
    run.transition(RunState::Idle)?;
    log.log(&format!("run {} {} -> {}", run.run_id, from, run.state));
    runs.save(&run)?;
    Ok(run)
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub plan: PlanSettings,
    pub retry: RetryPolicy,
    /// Credits charged per accepted prompt.
    pub credit_cost: u64,
    /// Capacity of the progress event channel.
    pub event_buffer: usize,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            plan: PlanSettings::default(),
            retry: RetryPolicy::default(),
            credit_cost: 1,
            event_buffer: 64,
        }
    }
}

impl From<&ForgeSettings> for OrchestratorOptions {
    fn from(settings: &ForgeSettings) -> Self {
        Self {
            plan: settings.plan_settings(),
            retry: settings.retry.clone(),
            credit_cost: settings.generation.credit_cost,
            ..Self::default()
        }
    }
}

type EventSender<'a> = Option<&'a mpsc::Sender<ProgressEvent>>;

async fn emit(events: EventSender<'_>, event: ProgressEvent) {
    if let Some(tx) = events {
        if tx.send(event).await.is_err() {
            tracing::debug!("progress receiver dropped; continuing without events");
        }
    }
}

pub struct GenerationOrchestrator {
    builder: PlanBuilder,
    generator: FileGenerator,
    ledger: Arc<dyn CreditLedger>,
    change_store: Arc<dyn ChangeStore>,
    project_store: Arc<dyn ProjectStore>,
    runs: RunStore,
    log: LogDispatcher,
    retry: RetryPolicy,
    credit_cost: u64,
    event_buffer: usize,
}

impl GenerationOrchestrator {
    /// Create an orchestrator. Transitions are logged through tracing; add
    /// more sinks with [`with_log_sink`](Self::with_log_sink).
    pub fn new(
        provider: Arc<dyn TextCompletionProvider>,
        collaborators: Collaborators,
        options: OrchestratorOptions,
    ) -> Self {
        let mut log = LogDispatcher::new();
        log.add_sink(Box::new(TracingLogSink));
        Self {
            builder: PlanBuilder::new(Arc::clone(&provider), options.plan.clone()),
            generator: FileGenerator::new(provider, options.plan),
            ledger: collaborators.ledger,
            change_store: collaborators.change_store,
            project_store: collaborators.project_store,
            runs: collaborators.runs,
            log,
            retry: options.retry,
            credit_cost: options.credit_cost,
            event_buffer: options.event_buffer,
        }
    }

    /// Fully file-backed orchestrator for a project root, with the provider
    /// chosen by forge.toml and a JSONL run log.
    pub fn from_config(config: &ForgeConfig, settings: &ForgeSettings) -> Result<Self, RunError> {
        let provider = settings.provider.build().map_err(PlanError::from)?;
        let collaborators = Collaborators::from_config(config)?;
        Ok(Self::new(provider, collaborators, settings.into())
            .with_log_sink(Box::new(JsonlLogSink::new(&config.log_file))))
    }

    pub fn with_log_sink(mut self, sink: Box<dyn LogSink>) -> Self {
        self.log.add_sink(sink);
        self
    }

    pub fn runs(&self) -> &RunStore {
        &self.runs
    }

    pub fn ledger(&self) -> &Arc<dyn CreditLedger> {
        &self.ledger
    }

    /// A change tracker for `project_id` that applies accepted changes to
    /// the project store.
    pub fn tracker(&self, project_id: &str) -> Result<ChangeTracker, RunError> {
        Ok(
            ChangeTracker::load(project_id, Arc::clone(&self.change_store))?
                .with_project_store(Arc::clone(&self.project_store)),
        )
    }

    /// Run a generation to completion and return its report.
    ///
    /// Validation and credit failures return `Err` before any completion
    /// request. Pipeline failures and cancellation return `Ok` with the
    /// run's final state in the report.
    pub async fn run(
        &self,
        request: GenerationRequest,
        cancel: CancellationFlag,
    ) -> Result<RunReport, RunError> {
        self.execute(request, cancel, None).await
    }

    /// Spawn a generation on the tokio runtime and stream its progress.
    ///
    /// The stream ends after the run's final event. Dropping the stream does
    /// not stop the run; use `cancel` for that.
    pub fn start_generation(
        self: &Arc<Self>,
        request: GenerationRequest,
        cancel: CancellationFlag,
    ) -> ReceiverStream<ProgressEvent> {
        let (tx, rx) = mpsc::channel(self.event_buffer.max(1));
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = this.execute(request, cancel, Some(&tx)).await {
                tracing::warn!("generation aborted: {}", e);
                emit(
                    Some(&tx),
                    ProgressEvent::Aborted {
                        message: e.to_string(),
                    },
                )
                .await;
            }
        });
        ReceiverStream::new(rx)
    }

    /// Rewrite one project file according to an instruction, recording the
    /// result as a pending change. A path not yet in the project produces a
    /// `created` change.
    pub async fn modify(&self, request: ModifyRequest) -> Result<FileChange, RunError> {
        self.generator
            .validate_description(&request.path, &request.instruction)?;

        let files: HashMap<String, String> = self
            .project_store
            .load(&request.project_id)
            .map_err(RunError::Project)?
            .into_iter()
            .map(|f| (f.path, f.content))
            .collect();
        let current = files.get(&request.path).cloned().unwrap_or_default();

        self.charge(&request.user_id)?;

        let content = self
            .retry
            .run("modifying", || {
                self.generator
                    .modify_file(&request.path, &current, &request.instruction, &files)
            })
            .await?;

        let mut tracker = self.tracker(&request.project_id)?;
        let change = tracker.record_change(
            request.path.clone(),
            current,
            content,
            Some(request.instruction.clone()),
        )?;
        self.log.log(&format!(
            "project {} {} change {} recorded for {}",
            request.project_id, change.change_type, change.id, change.file_path
        ));
        Ok(change)
    }

    /// Return a reviewed run to `idle`. Fails while any of its changes is
    /// still pending.
    pub fn finish_review(&self, run_id: Uuid) -> Result<GenerationRun, RunError> {
        close_review(&self.runs, self.change_store.as_ref(), &self.log, run_id)
    }

    async fn execute(
        &self,
        request: GenerationRequest,
        cancel: CancellationFlag,
        events: EventSender<'_>,
    ) -> Result<RunReport, RunError> {
        self.builder.validate_prompt(&request.prompt)?;
        self.charge(&request.user_id)?;

        let mut run = GenerationRun::new(request.user_id, String::new(), request.prompt);
        run.project_id = request
            .project_id
            .unwrap_or_else(|| run.run_id.to_string());
        let mut tracker = self.tracker(&run.project_id)?;
        let existing: HashMap<String, String> = self
            .project_store
            .load(&run.project_id)
            .map_err(RunError::Project)?
            .into_iter()
            .map(|f| (f.path, f.content))
            .collect();

        self.transition(&mut run, RunState::Planning)?;
        let prompt = run.prompt.clone();
        let planned = self
            .retry
            .run("planning", || self.builder.build_plan(&prompt))
            .await;
        let manifest = match planned {
            Ok(manifest) => manifest,
            Err(e) => {
                let failure = self.failure(&run, RunStep::Planning, None, &e);
                return self.fail(run, &tracker, failure, events).await;
            }
        };

        self.transition(&mut run, RunState::Resolving)?;
        let order = match resolve(&manifest.files) {
            Ok(order) => order,
            Err(e) => {
                run.manifest = Some(manifest);
                let failure = self.failure(&run, RunStep::Resolving, None, &e);
                return self.fail(run, &tracker, failure, events).await;
            }
        };
        run.manifest = Some(manifest.clone());
        run.set_order(order.clone());
        self.runs.save(&run)?;
        emit(
            events,
            ProgressEvent::PlanReady {
                run_id: run.run_id,
                manifest: manifest.clone(),
                order: order.clone(),
            },
        )
        .await;

        let entries: Vec<&FileManifestEntry> =
            order.iter().filter_map(|p| manifest.entry(p)).collect();
        let total = entries.len();
        let mut generated: HashMap<String, String> = HashMap::new();

        for (index, entry) in entries.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return self.cancel_run(run, &tracker, events).await;
            }
            self.transition(&mut run, RunState::Generating { index, total })?;
            set_status(&mut run, &entry.path, FileStatus::Generating);
            emit(
                events,
                ProgressEvent::FileStarted {
                    run_id: run.run_id,
                    path: entry.path.clone(),
                    index,
                    total,
                },
            )
            .await;

            let dependencies: HashMap<String, String> = entry
                .dependencies
                .iter()
                .filter_map(|dep| generated.get(dep).map(|c| (dep.clone(), c.clone())))
                .collect();
            let result = self
                .retry
                .run("generating", || {
                    self.generator.generate_file(entry, &dependencies)
                })
                .await;

            let content = match result {
                Ok(content) => content,
                Err(e) => {
                    set_status(&mut run, &entry.path, FileStatus::Error);
                    emit(
                        events,
                        ProgressEvent::FileFailed {
                            run_id: run.run_id,
                            path: entry.path.clone(),
                            error: e.to_string(),
                        },
                    )
                    .await;
                    let failure =
                        self.failure(&run, RunStep::Generating, Some(entry.path.clone()), &e);
                    return self.fail(run, &tracker, failure, events).await;
                }
            };

            let original = existing.get(&entry.path).cloned().unwrap_or_default();
            let change = match tracker.record_change(
                entry.path.clone(),
                original,
                content.clone(),
                Some(entry.description.clone()),
            ) {
                Ok(change) => change,
                Err(e) => {
                    set_status(&mut run, &entry.path, FileStatus::Error);
                    let failure = RunFailure {
                        step: RunStep::Generating,
                        path: Some(entry.path.clone()),
                        message: e.to_string(),
                        retryable: false,
                        completed_files: run.completed_files(),
                    };
                    return self.fail(run, &tracker, failure, events).await;
                }
            };

            run.change_ids.push(change.id);
            if let Some(file) = run.file_mut(&entry.path) {
                file.status = FileStatus::Completed;
                file.content = content.clone();
            }
            generated.insert(entry.path.clone(), content);
            self.runs.save(&run)?;
            emit(
                events,
                ProgressEvent::FileCompleted {
                    run_id: run.run_id,
                    path: entry.path.clone(),
                    change,
                },
            )
            .await;
        }

        self.transition(&mut run, RunState::Reviewing)?;
        let changes = run_changes(&run, &tracker);
        emit(
            events,
            ProgressEvent::RunCompleted {
                run_id: run.run_id,
                changes: changes.clone(),
            },
        )
        .await;
        Ok(RunReport {
            run,
            changes,
            failure: None,
        })
    }

    /// Credit gate: one combined check-and-deduct per accepted prompt.
    fn charge(&self, user_id: &str) -> Result<(), RunError> {
        if self.ledger.check_and_deduct(user_id, self.credit_cost)? {
            Ok(())
        } else {
            Err(RunError::InsufficientCredits {
                user_id: user_id.to_string(),
                required: self.credit_cost,
            })
        }
    }

    fn transition(&self, run: &mut GenerationRun, next: RunState) -> Result<(), RunError> {
        let from = run.state.to_string();
        run.transition(next)?;
        let detail = match &run.state {
            RunState::Generating { index, total } => format!(" ({}/{})", index + 1, total),
            RunState::Failed { step, reason } => format!(" at {}: {}", step, reason),
            _ => String::new(),
        };
        self.log
            .log(&format!("run {} {} -> {}{}", run.run_id, from, run.state, detail));
        self.runs.save(run)
    }

    fn failure(
        &self,
        run: &GenerationRun,
        step: RunStep,
        path: Option<String>,
        error: &PlanError,
    ) -> RunFailure {
        RunFailure {
            step,
            path,
            message: error.to_string(),
            retryable: error.is_retryable(),
            completed_files: run.completed_files(),
        }
    }

    async fn fail(
        &self,
        mut run: GenerationRun,
        tracker: &ChangeTracker,
        failure: RunFailure,
        events: EventSender<'_>,
    ) -> Result<RunReport, RunError> {
        self.transition(
            &mut run,
            RunState::Failed {
                step: failure.step,
                reason: failure.message.clone(),
            },
        )?;
        emit(
            events,
            ProgressEvent::RunFailed {
                run_id: run.run_id,
                failure: failure.clone(),
            },
        )
        .await;
        let changes = run_changes(&run, tracker);
        Ok(RunReport {
            run,
            changes,
            failure: Some(failure),
        })
    }

    async fn cancel_run(
        &self,
        mut run: GenerationRun,
        tracker: &ChangeTracker,
        events: EventSender<'_>,
    ) -> Result<RunReport, RunError> {
        self.transition(&mut run, RunState::Cancelled)?;
        emit(
            events,
            ProgressEvent::RunCancelled {
                run_id: run.run_id,
                completed_files: run.completed_files(),
            },
        )
        .await;
        let changes = run_changes(&run, tracker);
        Ok(RunReport {
            run,
            changes,
            failure: None,
        })
    }
}

fn set_status(run: &mut GenerationRun, path: &str, status: FileStatus) {
    if let Some(file) = run.file_mut(path) {
        file.status = status;
    }
}

fn run_changes(run: &GenerationRun, tracker: &ChangeTracker) -> Vec<FileChange> {
    run.change_ids
        .iter()
        .filter_map(|id| tracker.get(*id).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemoryLogSink;
    use crate::ledger::MemoryCreditLedger;
    use pf_changeset::{MemoryChangeStore, MemoryProjectStore};
    use pf_completion::ScriptedProvider;
    use tempfile::TempDir;

    const ONE_FILE: &str =
        r#"{"projectName": "solo", "files": [{"path": "main.ts", "description": "entry point"}]}"#;

    fn orchestrator(provider: Arc<ScriptedProvider>, dir: &TempDir) -> GenerationOrchestrator {
        let collaborators = Collaborators {
            ledger: Arc::new(MemoryCreditLedger::new().with_balance("user", 10)),
            change_store: Arc::new(MemoryChangeStore::new()),
            project_store: Arc::new(MemoryProjectStore::new()),
            runs: RunStore::new(dir.path()).unwrap(),
        };
        let options = OrchestratorOptions {
            retry: RetryPolicy::immediate(3),
            ..OrchestratorOptions::default()
        };
        GenerationOrchestrator::new(provider, collaborators, options)
    }

    #[tokio::test]
    async fn every_transition_is_logged_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_response(ONE_FILE)
                .with_response("console.log('hi');"),
        );
        let log = MemoryLogSink::new();
        let orch = orchestrator(provider, &dir).with_log_sink(Box::new(log.clone()));

        let report = orch
            .run(
                GenerationRequest::new("a single file hello world", "user").with_project("p"),
                CancellationFlag::new(),
            )
            .await
            .unwrap();

        assert!(report.is_success());
        let messages = log.messages();
        assert_eq!(messages.len(), 4);
        assert!(messages[0].ends_with("idle -> planning"));
        assert!(messages[2].ends_with("resolving -> generating (1/1)"));
        assert!(messages[3].ends_with("generating -> reviewing"));

        let stored = orch.runs().get(report.run.run_id).unwrap().unwrap();
        assert_eq!(stored.state, RunState::Reviewing);
        assert_eq!(stored.change_ids, vec![report.changes[0].id]);
    }

    #[tokio::test]
    async fn missing_project_id_defaults_to_run_id() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_response(ONE_FILE)
                .with_response("x"),
        );
        let report = orchestrator(provider, &dir)
            .run(
                GenerationRequest::new("a single file hello world", "user"),
                CancellationFlag::new(),
            )
            .await
            .unwrap();
        assert_eq!(report.run.project_id, report.run.run_id.to_string());
    }

    #[tokio::test]
    async fn finish_review_requires_resolved_changes() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_response(ONE_FILE)
                .with_response("x"),
        );
        let orch = orchestrator(provider, &dir);
        let report = orch
            .run(
                GenerationRequest::new("a single file hello world", "user").with_project("p"),
                CancellationFlag::new(),
            )
            .await
            .unwrap();
        let run_id = report.run.run_id;

        assert!(matches!(
            orch.finish_review(run_id),
            Err(RunError::ReviewPending { pending: 1, .. })
        ));

        let mut tracker = orch.tracker("p").unwrap();
        tracker.reject(report.changes[0].id).unwrap();
        let run = orch.finish_review(run_id).unwrap();
        assert_eq!(run.state, RunState::Idle);
    }

    #[tokio::test]
    async fn collaborators_close_review_without_a_provider() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_response(ONE_FILE)
                .with_response("x"),
        );
        let change_store = Arc::new(MemoryChangeStore::new());
        let collaborators = || Collaborators {
            ledger: Arc::new(MemoryCreditLedger::new().with_balance("user", 1)),
            change_store: change_store.clone(),
            project_store: Arc::new(MemoryProjectStore::new()),
            runs: RunStore::new(dir.path()).unwrap(),
        };
        let orch = GenerationOrchestrator::new(
            provider,
            collaborators(),
            OrchestratorOptions {
                retry: RetryPolicy::immediate(1),
                ..OrchestratorOptions::default()
            },
        );
        let report = orch
            .run(
                GenerationRequest::new("a single file hello world", "user").with_project("p"),
                CancellationFlag::new(),
            )
            .await
            .unwrap();
        let run_id = report.run.run_id;

        let standalone = collaborators();
        let log = MemoryLogSink::new();
        let mut dispatcher = LogDispatcher::new();
        dispatcher.add_sink(Box::new(log.clone()));
        assert!(matches!(
            standalone.finish_review(run_id, &dispatcher),
            Err(RunError::ReviewPending { pending: 1, .. })
        ));

        orch.tracker("p").unwrap().accept_all();
        let run = standalone.finish_review(run_id, &dispatcher).unwrap();
        assert_eq!(run.state, RunState::Idle);
        assert_eq!(
            standalone.runs.get(run_id).unwrap().unwrap().state,
            RunState::Idle
        );
        assert!(log.messages()[0].ends_with("reviewing -> idle"));
    }

    #[tokio::test]
    async fn modify_records_a_modified_change() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new().with_response("const a = 2;\n"));
        let project_store = Arc::new(MemoryProjectStore::new());
        project_store
            .save("p", &[pf_changeset::ProjectFile::completed("a.ts", "const a = 1;\n")])
            .unwrap();
        let ledger = Arc::new(MemoryCreditLedger::new().with_balance("user", 1));
        let orch = GenerationOrchestrator::new(
            provider.clone(),
            Collaborators {
                ledger: ledger.clone(),
                change_store: Arc::new(MemoryChangeStore::new()),
                project_store,
                runs: RunStore::new(dir.path()).unwrap(),
            },
            OrchestratorOptions::default(),
        );

        let change = orch
            .modify(ModifyRequest {
                project_id: "p".into(),
                path: "a.ts".into(),
                instruction: "bump the constant".into(),
                user_id: "user".into(),
            })
            .await
            .unwrap();

        assert_eq!(change.change_type, pf_changeset::ChangeType::Modified);
        assert_eq!(change.original_content, "const a = 1;\n");
        assert_eq!(change.modified_content, "const a = 2;\n");
        assert!(change.is_pending());
        assert_eq!(ledger.balance("user").unwrap(), 0);
        assert!(provider.requests()[0].prompt.contains("const a = 1;"));
    }

    #[tokio::test]
    async fn modify_rejects_short_instruction_without_charging() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new());
        let orch = orchestrator(provider.clone(), &dir);
        let err = orch
            .modify(ModifyRequest {
                project_id: "p".into(),
                path: "a.ts".into(),
                instruction: "x".into(),
                user_id: "user".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Plan(PlanError::Validation(_))));
        assert_eq!(orch.ledger().balance("user").unwrap(), 10);
        assert_eq!(provider.request_count(), 0);
    }
}
