// generate.rs — Generate a project from a prompt, streaming progress.

use std::sync::Arc;

use clap::Args;
use pf_run::{
    CancellationFlag, ForgeConfig, GenerationOrchestrator, GenerationRequest, ProgressEvent,
};
use tokio_stream::StreamExt;

#[derive(Args)]
pub struct GenerateArgs {
    /// What to build (e.g., "a todo app with a REST API and a React UI").
    pub prompt: String,
    /// User charged for the run.
    #[arg(long, default_value = "local")]
    pub user: String,
    /// Generate into an existing project instead of a new one.
    #[arg(long)]
    pub project: Option<String>,
    /// Print each event as a JSON line.
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: &GenerateArgs, config: &ForgeConfig) -> anyhow::Result<()> {
    let settings = config.load_settings()?;
    let orchestrator = Arc::new(GenerationOrchestrator::from_config(config, &settings)?);

    let mut request = GenerationRequest::new(&args.prompt, &args.user);
    if let Some(project) = &args.project {
        request = request.with_project(project);
    }

    // Ctrl-C stops the run after the file in flight.
    let cancel = CancellationFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling after the current file...");
            on_interrupt.cancel();
        }
    });

    let mut events = orchestrator.start_generation(request, cancel);
    let mut outcome = None;
    while let Some(event) = events.next().await {
        if args.json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{}", describe(&event));
        }
        if event.is_final() {
            outcome = Some(event);
        }
    }

    match outcome {
        Some(ProgressEvent::RunCompleted { run_id, .. }) => {
            if !args.json {
                println!();
                println!("Review with: forge runs status {}", run_id);
            }
            Ok(())
        }
        Some(ProgressEvent::RunCancelled { .. }) => Ok(()),
        Some(ProgressEvent::RunFailed { failure, .. }) => {
            anyhow::bail!("generation failed at {}: {}", failure.step, failure.message)
        }
        Some(ProgressEvent::Aborted { message }) => anyhow::bail!("generation refused: {}", message),
        _ => anyhow::bail!("generation ended without a final event"),
    }
}

/// One human-readable line per event.
fn describe(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::PlanReady {
            run_id,
            manifest,
            order,
        } => format!(
            "Run {}: planned \"{}\" with {} files ({})",
            run_id,
            manifest.project_name,
            order.len(),
            order.join(", ")
        ),
        ProgressEvent::FileStarted {
            path, index, total, ..
        } => format!("  [{}/{}] generating {}", index + 1, total, path),
        ProgressEvent::FileCompleted { path, change, .. } => {
            let diff = change.diff();
            format!(
                "        {} {} (+{} -{})",
                change.change_type, path, diff.additions, diff.deletions
            )
        }
        ProgressEvent::FileFailed { path, error, .. } => {
            format!("        failed {}: {}", path, error)
        }
        ProgressEvent::RunCompleted { changes, .. } => {
            format!("Done: {} changes pending review.", changes.len())
        }
        ProgressEvent::RunFailed { failure, .. } => {
            let mut line = format!("Failed at {}: {}", failure.step, failure.message);
            if failure.retryable {
                line.push_str(" (retryable)");
            }
            if !failure.completed_files.is_empty() {
                line.push_str(&format!(
                    "; kept {} completed files",
                    failure.completed_files.len()
                ));
            }
            line
        }
        ProgressEvent::RunCancelled {
            completed_files, ..
        } => format!(
            "Cancelled with {} files generated.",
            completed_files.len()
        ),
        ProgressEvent::Aborted { message } => format!("Refused: {}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_changeset::FileChange;
    use pf_run::{RunFailure, RunStep};
    use uuid::Uuid;

    #[test]
    fn describes_file_progress() {
        let run_id = Uuid::new_v4();
        let started = ProgressEvent::FileStarted {
            run_id,
            path: "src/app.ts".to_string(),
            index: 1,
            total: 3,
        };
        assert_eq!(describe(&started), "  [2/3] generating src/app.ts");

        let change = FileChange::new("src/app.ts", "", "a\nb\n", chrono::Utc::now());
        let completed = ProgressEvent::FileCompleted {
            run_id,
            path: "src/app.ts".to_string(),
            change,
        };
        assert_eq!(describe(&completed), "        created src/app.ts (+2 -0)");
    }

    #[test]
    fn describes_failure_with_kept_files() {
        let failed = ProgressEvent::RunFailed {
            run_id: Uuid::new_v4(),
            failure: RunFailure {
                step: RunStep::Generating,
                path: Some("b.ts".to_string()),
                message: "rate limited".to_string(),
                retryable: true,
                completed_files: vec!["a.ts".to_string()],
            },
        };
        assert_eq!(
            describe(&failed),
            "Failed at generating: rate limited (retryable); kept 1 completed files"
        );
    }
}
