//! # pf-run
//!
//! Generation run lifecycle for PromptForge.
//!
//! A [`GenerationRun`] carries one prompt through a state machine
//! (idle → planning → resolving → generating → reviewing → idle, with
//! failed/cancelled as terminal exits). The [`GenerationOrchestrator`] drives
//! it: it gates on credits, plans, orders, and generates files one at a time,
//! recording each as a pending change and streaming [`ProgressEvent`]s.
//!
//! ## Key components
//!
//! - [`GenerationOrchestrator`] — runs, streams, modifications, review close-out
//! - [`RunState`] / [`GenerationRun`] — the lifecycle record
//! - [`ProgressEvent`] / [`LogSink`] — progress stream and transition log
//! - [`CreditLedger`] — the pre-run credit gate
//! - [`RunStore`] — one JSON file per run
//! - [`RetryPolicy`] — backoff for retryable completion failures
//! - [`ForgeConfig`] / [`ForgeSettings`] — `.forge/` layout and forge.toml

pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod orchestrator;
pub mod retry;
pub mod run;
pub mod store;

pub use config::{ForgeConfig, ForgeSettings, GenerationSettings};
pub use error::RunError;
pub use events::{
    JsonlLogSink, LogDispatcher, LogSink, MemoryLogSink, ProgressEvent, TracingLogSink,
};
pub use ledger::{CreditLedger, JsonCreditLedger, MemoryCreditLedger};
pub use orchestrator::{
    CancellationFlag, Collaborators, GenerationOrchestrator, GenerationRequest, ModifyRequest,
    OrchestratorOptions, RunFailure, RunReport,
};
pub use retry::RetryPolicy;
pub use run::{GeneratedFile, GenerationRun, RunState, RunStep};
pub use store::RunStore;
