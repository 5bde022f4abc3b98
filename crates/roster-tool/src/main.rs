//! # roster-tool
//!
//! Command line companion for the buddy list store.
//!
//! Commands (first argument, default `show`):
//! - **show**: print the tree with `[online/current/total]` counters
//! - **check**: run the consistency audit, exit non-zero on problems
//! - **stats**: print a JSON summary
//! - **rewrite**: save the list back in canonical form

mod config;
mod error;
mod render;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use roster_shared::{AccountRegistry, Accounts};
use roster_store::BuddyList;

use crate::config::ToolConfig;
use crate::error::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Show,
    Check,
    Stats,
    Rewrite,
}

impl Command {
    fn parse(arg: &str) -> Result<Self, ToolError> {
        match arg {
            "show" => Ok(Command::Show),
            "check" => Ok(Command::Check),
            "stats" => Ok(Command::Stats),
            "rewrite" => Ok(Command::Rewrite),
            other => Err(ToolError::UnknownCommand(other.to_string())),
        }
    }
}

fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,roster_store=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting roster tool v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ToolConfig::from_env();
    let command = match std::env::args().nth(1) {
        Some(arg) => Command::parse(&arg)?,
        None => Command::Show,
    };
    info!(?config, ?command, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Build the account registry and load the list
    // -----------------------------------------------------------------------
    let mut accounts = AccountRegistry::new().with_adoption(config.adopt_accounts);
    for (username, protocol) in &config.accounts {
        accounts.add(username, protocol);
    }

    let mut list = BuddyList::new(accounts, config.store.clone());
    list.load().map_err(ToolError::from)?;

    if config.connect {
        for account in list.accounts().account_ids() {
            list.accounts_mut().set_connected(account, true);
            list.account_connected(account);
        }
    }

    // -----------------------------------------------------------------------
    // 4. Run the command
    // -----------------------------------------------------------------------
    match command {
        Command::Show => print!("{}", render::render_tree(&list)),
        Command::Check => {
            let problems = list.check_consistency();
            for problem in &problems {
                warn!(?problem, "Inconsistency");
            }
            if !problems.is_empty() {
                error!(count = problems.len(), "Buddy list failed the audit");
                return Err(ToolError::Inconsistent(problems.len()).into());
            }
            println!("ok");
        }
        Command::Stats => {
            let stats = render::collect_stats(&list);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Rewrite => {
            list.save().map_err(ToolError::from)?;
            info!(path = %list.config().blist_path().display(), "Rewrote buddy list");
        }
    }

    Ok(())
}
