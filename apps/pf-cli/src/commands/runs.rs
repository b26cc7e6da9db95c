// runs.rs — Run subcommands: list, status, finish.

use clap::Subcommand;
use pf_run::{
    Collaborators, ForgeConfig, GenerationRun, JsonlLogSink, LogDispatcher, RunStore,
    TracingLogSink,
};
use uuid::Uuid;

#[derive(Subcommand)]
pub enum RunsCommands {
    /// List generation runs, newest first.
    List {
        /// Only runs for this project.
        #[arg(long)]
        project: Option<String>,
    },
    /// Show one run's state, plan, and file progress.
    Status {
        /// Run ID.
        id: String,
        /// Print the full run record as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Return a reviewed run to idle once none of its changes is pending.
    Finish {
        /// Run ID.
        id: String,
    },
}

pub fn execute(cmd: &RunsCommands, config: &ForgeConfig) -> anyhow::Result<()> {
    match cmd {
        RunsCommands::List { project } => {
            list_runs(&RunStore::new(&config.runs_dir)?, project.as_deref())
        }
        RunsCommands::Status { id, json } => {
            show_status(&RunStore::new(&config.runs_dir)?, id, *json)
        }
        RunsCommands::Finish { id } => finish_run(config, id),
    }
}

fn parse_id(id: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(id).map_err(|e| anyhow::anyhow!("invalid run ID {:?}: {}", id, e))
}

/// Close out review from the stores alone; no provider credentials needed.
fn finish_run(config: &ForgeConfig, id: &str) -> anyhow::Result<()> {
    let collaborators = Collaborators::from_config(config)?;
    let mut log = LogDispatcher::new();
    log.add_sink(Box::new(TracingLogSink));
    log.add_sink(Box::new(JsonlLogSink::new(&config.log_file)));

    let run = collaborators.finish_review(parse_id(id)?, &log)?;
    println!("Run {} is {}.", run.run_id, run.state);
    Ok(())
}

fn list_runs(store: &RunStore, project: Option<&str>) -> anyhow::Result<()> {
    let runs = match project {
        Some(project) => store.list_for_project(project)?,
        None => store.list()?,
    };

    if runs.is_empty() {
        println!("No generation runs found.");
        return Ok(());
    }

    println!(
        "{:<38} {:<12} {:<7} {:<20} PROMPT",
        "ID", "STATE", "FILES", "CREATED"
    );
    println!("{}", "-".repeat(100));
    for run in &runs {
        println!(
            "{:<38} {:<12} {:<7} {:<20} {}",
            run.run_id,
            run.state.to_string(),
            format!("{}/{}", run.completed_files().len(), run.files.len()),
            run.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            truncate(&run.prompt, 40)
        );
    }
    println!();
    println!("{} run(s) total.", runs.len());
    Ok(())
}

fn show_status(store: &RunStore, id: &str, json: bool) -> anyhow::Result<()> {
    let run_id = parse_id(id)?;
    let run = store
        .get(run_id)?
        .ok_or_else(|| anyhow::anyhow!("run not found: {}", run_id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
        return Ok(());
    }
    print!("{}", render_status(&run));
    Ok(())
}

fn render_status(run: &GenerationRun) -> String {
    let mut out = String::new();
    out.push_str(&format!("Run:      {}\n", run.run_id));
    out.push_str(&format!("Project:  {}\n", run.project_id));
    out.push_str(&format!("User:     {}\n", run.user_id));
    out.push_str(&format!("State:    {}\n", run.state));
    out.push_str(&format!(
        "Created:  {}\n",
        run.created_at.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("Prompt:   {}\n", run.prompt));
    if let Some(manifest) = &run.manifest {
        out.push_str(&format!("Plan:     {}\n", manifest.project_name));
    }
    if !run.files.is_empty() {
        out.push('\n');
        for file in &run.files {
            out.push_str(&format!("  {:<10} {}\n", file.status.to_string(), file.path));
        }
    }
    out
}

fn truncate(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max_chars && line.len() == text.len() {
        return line.to_string();
    }
    let cut: String = line.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut)
}
