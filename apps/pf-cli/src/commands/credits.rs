// credits.rs — Credit subcommands: show, grant.

use clap::Subcommand;
use pf_run::{Collaborators, CreditLedger, ForgeConfig};

#[derive(Subcommand)]
pub enum CreditsCommands {
    /// Show a user's balance.
    Show {
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Add credits to a user's balance.
    Grant {
        #[arg(long, default_value = "local")]
        user: String,
        /// Credits to add.
        amount: u64,
    },
}

pub fn execute(cmd: &CreditsCommands, config: &ForgeConfig) -> anyhow::Result<()> {
    let ledger = Collaborators::from_config(config)?.ledger;
    match cmd {
        CreditsCommands::Show { user } => show(ledger.as_ref(), user),
        CreditsCommands::Grant { user, amount } => {
            let balance = ledger.grant(user, *amount)?;
            println!("Granted {} credits to {}; balance is now {}.", amount, user, balance);
            Ok(())
        }
    }
}

fn show(ledger: &dyn CreditLedger, user: &str) -> anyhow::Result<()> {
    let balance = ledger.balance(user)?;
    println!("{}: {} credits", user, balance);
    Ok(())
}
