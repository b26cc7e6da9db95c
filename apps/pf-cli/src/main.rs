//! # pf-cli
//!
//! Command-line interface for PromptForge.
//!
//! Turns a prompt into a reviewed set of project files:
//! - `forge generate` — plan, order, and generate a project from a prompt
//! - `forge modify` — rewrite one project file from an instruction
//! - `forge changes list/diff/accept/reject/accept-all/reject-all` — review pending changes
//! - `forge runs list/status/finish` — inspect generation runs and close out review
//! - `forge credits show/grant` — manage the per-user credit ledger

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pf_run::ForgeConfig;
use tracing_subscriber::EnvFilter;

/// PromptForge CLI — generate projects from prompts and review the result.
#[derive(Parser)]
#[command(name = "forge", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".", global = true)]
    project_root: PathBuf,

    /// Log debug detail to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a project from a prompt.
    Generate(commands::generate::GenerateArgs),
    /// Rewrite one project file according to an instruction.
    Modify(commands::modify::ModifyArgs),
    /// Review recorded file changes.
    Changes {
        #[command(subcommand)]
        command: commands::changes::ChangesCommands,
    },
    /// Inspect generation runs.
    Runs {
        #[command(subcommand)]
        command: commands::runs::RunsCommands,
    },
    /// Inspect and grant credits.
    Credits {
        #[command(subcommand)]
        command: commands::credits::CreditsCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only command output.
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("pf_run={level}").parse()?)
                .add_directive(format!("pf_plan={level}").parse()?)
                .add_directive(format!("pf_completion={level}").parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let config = ForgeConfig::for_project(&project_root);

    match &cli.command {
        Commands::Generate(args) => commands::generate::execute(args, &config).await,
        Commands::Modify(args) => commands::modify::execute(args, &config).await,
        Commands::Changes { command } => commands::changes::execute(command, &config),
        Commands::Runs { command } => commands::runs::execute(command, &config),
        Commands::Credits { command } => commands::credits::execute(command, &config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_root_is_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "forge",
            "runs",
            "list",
            "--project-root",
            "/work/app",
        ])
        .unwrap();
        assert_eq!(cli.project_root, PathBuf::from("/work/app"));

        let cli = Cli::try_parse_from(["forge", "credits", "show"]).unwrap();
        assert_eq!(cli.project_root, PathBuf::from("."));
    }
}
