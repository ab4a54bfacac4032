//! `budgeteer` command-line front end.
//!
//! # Responsibility
//! - Resolve config and data locations, start logging, wire the core store.
//! - Map subcommands onto `BudgetStore` operations.

mod commands;
mod paths;

use anyhow::{Context, Result};
use budgeteer_core::{
    default_log_level, init_logging, BudgetStore, BudgeteerConfig, CredentialStore,
    DropboxRemote, KeyValueStore, LocalStateStore, SqliteKeyValueStore,
};
use clap::Parser;
use commands::Command;
use paths::AppPaths;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "budgeteer", version)]
#[command(about = "Track daily spending against a budget, optionally mirrored to Dropbox")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the database and logs
    #[arg(long, env = "BUDGETEER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Path of the TOML config file
    #[arg(long, env = "BUDGETEER_CONFIG")]
    config: Option<PathBuf>,

    /// trace|debug|info|warn|error (overrides the config file)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = AppPaths::resolve(cli.data_dir, cli.config)?;
    let config = BudgeteerConfig::load(&paths.config_file)?;
    let level = cli
        .log_level
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| default_log_level().to_string());
    init_logging(&level, paths.log_dir()).context("failed to start logging")?;

    std::fs::create_dir_all(&paths.data_dir).with_context(|| {
        format!("failed to create data directory `{}`", paths.data_dir.display())
    })?;
    let kv: Arc<dyn KeyValueStore> = Arc::new(
        SqliteKeyValueStore::open(paths.db_file()).context("failed to open budget database")?,
    );
    let remote = DropboxRemote::new(config.dropbox, CredentialStore::new(Arc::clone(&kv)))
        .context("failed to set up Dropbox client")?;
    let mut store = BudgetStore::new(LocalStateStore::new(kv), Arc::new(remote));

    commands::run(cli.command, &mut store).await
}
