// modify.rs — Rewrite one project file from an instruction.

use clap::Args;
use pf_run::{ForgeConfig, GenerationOrchestrator, ModifyRequest};

#[derive(Args)]
pub struct ModifyArgs {
    /// Project-relative path of the file to rewrite (created if absent).
    pub path: String,
    /// What to change (e.g., "add input validation to the signup form").
    #[arg(long, short)]
    pub instruction: String,
    /// Project the file belongs to.
    #[arg(long)]
    pub project: String,
    /// User charged for the modification.
    #[arg(long, default_value = "local")]
    pub user: String,
}

pub async fn execute(args: &ModifyArgs, config: &ForgeConfig) -> anyhow::Result<()> {
    let settings = config.load_settings()?;
    let orchestrator = GenerationOrchestrator::from_config(config, &settings)?;

    let change = orchestrator
        .modify(ModifyRequest {
            project_id: args.project.clone(),
            path: args.path.clone(),
            instruction: args.instruction.clone(),
            user_id: args.user.clone(),
        })
        .await?;

    print!("{}", change.diff().to_unified(&change.file_path));
    println!();
    println!("Recorded {} change {} (pending review).", change.change_type, change.id);
    println!(
        "Accept with: forge changes accept {} --project {}",
        change.id, args.project
    );
    Ok(())
}
