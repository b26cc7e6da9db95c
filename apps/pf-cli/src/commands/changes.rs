// changes.rs — Change review subcommands: list, diff, accept, reject, and bulk forms.

use std::sync::Arc;

use clap::Subcommand;
use pf_changeset::{BatchOutcome, ChangeTracker};
use pf_run::{Collaborators, ForgeConfig};
use uuid::Uuid;

#[derive(Subcommand)]
pub enum ChangesCommands {
    /// List a project's changes, newest last.
    List {
        /// Project ID (a run's project defaults to its run ID).
        #[arg(long)]
        project: String,
        /// Show only changes awaiting review.
        #[arg(long)]
        pending: bool,
    },
    /// Show a change as a unified diff.
    Diff {
        /// Change ID.
        id: String,
        #[arg(long)]
        project: String,
    },
    /// Accept a change and write it to the project.
    Accept {
        /// Change ID.
        id: String,
        #[arg(long)]
        project: String,
    },
    /// Reject a change, leaving the project untouched.
    Reject {
        /// Change ID.
        id: String,
        #[arg(long)]
        project: String,
    },
    /// Accept every pending change in one project write.
    AcceptAll {
        #[arg(long)]
        project: String,
    },
    /// Reject every pending change.
    RejectAll {
        #[arg(long)]
        project: String,
    },
}

pub fn execute(cmd: &ChangesCommands, config: &ForgeConfig) -> anyhow::Result<()> {
    match cmd {
        ChangesCommands::List { project, pending } => {
            list_changes(&open_tracker(config, project)?, *pending)
        }
        ChangesCommands::Diff { id, project } => show_diff(&open_tracker(config, project)?, id),
        ChangesCommands::Accept { id, project } => {
            let change = open_tracker(config, project)?.accept(parse_id(id)?)?;
            println!("Accepted {} ({})", change.id, change.file_path);
            Ok(())
        }
        ChangesCommands::Reject { id, project } => {
            let change = open_tracker(config, project)?.reject(parse_id(id)?)?;
            println!("Rejected {} ({})", change.id, change.file_path);
            Ok(())
        }
        ChangesCommands::AcceptAll { project } => {
            let outcome = open_tracker(config, project)?.accept_all();
            report_batch("Accepted", &outcome)
        }
        ChangesCommands::RejectAll { project } => {
            let outcome = open_tracker(config, project)?.reject_all();
            report_batch("Rejected", &outcome)
        }
    }
}

/// A file-backed tracker whose accepted changes land in the project directory.
fn open_tracker(config: &ForgeConfig, project: &str) -> anyhow::Result<ChangeTracker> {
    let collaborators = Collaborators::from_config(config)?;
    let tracker = ChangeTracker::load(project, Arc::clone(&collaborators.change_store))?
        .with_project_store(collaborators.project_store);
    Ok(tracker)
}

fn parse_id(id: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(id).map_err(|e| anyhow::anyhow!("invalid change ID {:?}: {}", id, e))
}

fn list_changes(tracker: &ChangeTracker, pending_only: bool) -> anyhow::Result<()> {
    let changes: Vec<_> = tracker
        .changes()
        .iter()
        .filter(|c| !pending_only || c.is_pending())
        .collect();

    if changes.is_empty() {
        println!("No changes found for project {}.", tracker.project_id());
        return Ok(());
    }

    println!(
        "{:<38} {:<10} {:<10} {:<20} PATH",
        "ID", "TYPE", "STATUS", "RECORDED"
    );
    println!("{}", "-".repeat(100));
    for change in &changes {
        println!(
            "{:<38} {:<10} {:<10} {:<20} {}",
            change.id,
            change.change_type.to_string(),
            change.status.to_string(),
            change.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            change.file_path
        );
    }

    let counts = tracker.counts();
    println!();
    println!(
        "{} pending, {} accepted, {} rejected",
        counts.pending, counts.accepted, counts.rejected
    );
    Ok(())
}

fn show_diff(tracker: &ChangeTracker, id: &str) -> anyhow::Result<()> {
    let id = parse_id(id)?;
    let diff = tracker.diff(id)?;
    let path = tracker
        .get(id)
        .map(|c| c.file_path.as_str())
        .unwrap_or_default();
    print!("{}", diff.to_unified(path));
    println!("+{} -{}", diff.additions, diff.deletions);
    Ok(())
}

fn report_batch(verb: &str, outcome: &BatchOutcome) -> anyhow::Result<()> {
    println!("{} {} changes.", verb, outcome.resolved.len());
    for failure in &outcome.failed {
        eprintln!("  {} ({}): {}", failure.id, failure.file_path, failure.error);
    }
    if !outcome.is_complete() {
        anyhow::bail!("{} changes could not be resolved", outcome.failed.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_changeset::{ChangeStatus, ProjectStore};
    use tempfile::TempDir;

    #[test]
    fn accept_all_writes_files_and_persists_statuses() {
        let root = TempDir::new().unwrap();
        let config = ForgeConfig::for_project(root.path());

        let mut tracker = open_tracker(&config, "p1").unwrap();
        tracker.record_change("a.ts", "", "a", None).unwrap();
        tracker.record_change("b.ts", "", "b", None).unwrap();

        execute(
            &ChangesCommands::AcceptAll {
                project: "p1".to_string(),
            },
            &config,
        )
        .unwrap();

        let reloaded = open_tracker(&config, "p1").unwrap();
        assert!(reloaded
            .changes()
            .iter()
            .all(|c| c.status == ChangeStatus::Accepted));
        assert_eq!(
            std::fs::read_to_string(config.projects_dir.join("p1/b.ts")).unwrap(),
            "b"
        );
    }

    #[test]
    fn reject_leaves_project_untouched() {
        let root = TempDir::new().unwrap();
        let config = ForgeConfig::for_project(root.path());
        let change = open_tracker(&config, "p1")
            .unwrap()
            .record_change("a.ts", "", "a", None)
            .unwrap();

        execute(
            &ChangesCommands::Reject {
                id: change.id.to_string(),
                project: "p1".to_string(),
            },
            &config,
        )
        .unwrap();

        let collaborators = Collaborators::from_config(&config).unwrap();
        assert!(collaborators.project_store.load("p1").unwrap().is_empty());
        let reloaded = open_tracker(&config, "p1").unwrap();
        assert_eq!(reloaded.changes()[0].status, ChangeStatus::Rejected);
    }

    #[test]
    fn malformed_id_is_an_error() {
        let root = TempDir::new().unwrap();
        let config = ForgeConfig::for_project(root.path());
        let result = execute(
            &ChangesCommands::Accept {
                id: "not-a-uuid".to_string(),
                project: "p1".to_string(),
            },
            &config,
        );
        assert!(result.is_err());
    }
}
