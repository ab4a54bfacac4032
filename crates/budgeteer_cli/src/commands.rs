//! Subcommand definitions and their execution against the budget store.

use anyhow::Result;
use budgeteer_core::{BudgetStore, LoadSource, NewTransaction, PendingSync, SyncOutcome};
use clap::Subcommand;
use rust_decimal::Decimal;

const DEFAULT_LIST_LIMIT: usize = 20;

#[derive(Subcommand)]
pub enum Command {
    /// Show today's budget, spending and sync state
    Status,
    /// List transactions, most recent first
    List {
        #[arg(short, long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },
    /// Record a transaction; negative amounts are refunds
    Add {
        #[arg(allow_negative_numbers = true)]
        amount: Decimal,
        description: String,
        #[arg(short, long)]
        category: Option<String>,
        /// ISO-8601 date or timestamp; defaults to now
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Set the daily budget amount
    Budget { amount: Decimal },
    /// Push the current state to Dropbox and wait for the result
    Sync,
    /// Manage the Dropbox connection
    #[command(subcommand)]
    Dropbox(DropboxCommand),
}

#[derive(Subcommand)]
pub enum DropboxCommand {
    /// Store the Dropbox app key used for authorization
    SetKey { key: String },
    /// Print the URL to open for granting access
    AuthUrl,
    /// Finish authorization with the redirect URL (or the bare code)
    Connect { redirect: String },
    /// Forget the stored token and app key
    Disconnect,
}

impl Command {
    /// Whether the command reads or mutates budget state and therefore needs
    /// it loaded first. Connection management works without it, so a broken
    /// local blob never blocks `dropbox disconnect`.
    fn needs_state(&self) -> bool {
        !matches!(self, Self::Dropbox(_))
    }
}

pub async fn run(command: Command, store: &mut BudgetStore) -> Result<()> {
    if command.needs_state() {
        let source = store.initialize().await?;
        log::debug!("event=cli_command module=cli status=start source={source:?}");
    }

    match command {
        Command::Status => print_status(store),
        Command::List { limit } => print_list(store, limit),
        Command::Add {
            amount,
            description,
            category,
            date,
        } => {
            let input = NewTransaction {
                amount,
                description,
                category,
                date,
            };
            let (transaction, pending) = store.add_transaction(input).await?;
            println!(
                "Recorded {} {} ({})",
                money(transaction.amount),
                transaction.description,
                transaction.id
            );
            println!(
                "Remaining today: {} {}",
                money(store.remaining_budget()),
                store.daily_budget().currency
            );
            report_sync(pending).await;
        }
        Command::Budget { amount } => {
            let pending = store.update_daily_budget(amount).await?;
            let budget = store.daily_budget();
            println!(
                "Daily budget set to {} {}",
                money(budget.amount),
                budget.currency
            );
            report_sync(pending).await;
        }
        Command::Sync => {
            let outcome = store.sync_now().await?;
            print_outcome(&outcome);
        }
        Command::Dropbox(command) => run_dropbox(command, store).await?,
    }
    Ok(())
}

async fn run_dropbox(command: DropboxCommand, store: &mut BudgetStore) -> Result<()> {
    match command {
        DropboxCommand::SetKey { key } => {
            store.set_remote_app_key(&key)?;
            println!("Dropbox app key saved. Run `budgeteer dropbox auth-url` next.");
        }
        DropboxCommand::AuthUrl => {
            println!("{}", store.remote_auth_url()?);
        }
        DropboxCommand::Connect { redirect } => {
            let source = store.handle_remote_redirect(&redirect).await?;
            let origin = match source {
                LoadSource::Remote => "loaded data from Dropbox",
                LoadSource::Local => "no Dropbox data yet, kept local data",
                LoadSource::Default => "no data stored yet",
            };
            println!("Connected to Dropbox; {origin}.");
        }
        DropboxCommand::Disconnect => {
            store.disconnect_remote()?;
            println!("Disconnected from Dropbox.");
        }
    }
    Ok(())
}

fn print_status(store: &BudgetStore) {
    let budget = store.daily_budget();
    let today = store.todays_transactions();
    println!("Daily budget:    {} {}", money(budget.amount), budget.currency);
    let remaining = store.remaining_budget();
    println!(
        "Spent today:     {} ({} transactions)",
        money(budget.amount.saturating_sub(remaining)),
        today.len()
    );
    println!("Remaining today: {} {}", money(remaining), budget.currency);
    println!(
        "Dropbox:         {}",
        if store.is_authenticated() {
            "connected"
        } else if store.has_remote_app_key() {
            "app key set, not connected"
        } else {
            "not configured"
        }
    );
    println!(
        "Last sync:       {}",
        store.last_sync_time().as_deref().unwrap_or("never")
    );
}

fn print_list(store: &BudgetStore, limit: usize) {
    if store.transactions().is_empty() {
        println!("No transactions recorded.");
        return;
    }
    for transaction in store.transactions().iter().take(limit) {
        let category = transaction
            .category
            .as_deref()
            .map(|value| format!(" [{value}]"))
            .unwrap_or_default();
        println!(
            "{}  {:>10}  {}{}",
            transaction.date,
            money(transaction.amount),
            transaction.description,
            category
        );
    }
}

async fn report_sync(pending: PendingSync) {
    if pending.is_scheduled() {
        print_outcome(&pending.wait().await);
    }
}

fn print_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Skipped => println!("Dropbox sync skipped (not connected)."),
        SyncOutcome::Synced { at } => println!("Synced to Dropbox at {at}."),
        SyncOutcome::Failed(reason) => {
            println!("Dropbox sync failed, data kept locally: {reason}")
        }
    }
}

fn money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_budget_commands_load_state() {
        assert!(Command::Status.needs_state());
        assert!(Command::List { limit: 5 }.needs_state());
        assert!(Command::Sync.needs_state());
        assert!(Command::Budget {
            amount: Decimal::from(40)
        }
        .needs_state());

        for command in [
            DropboxCommand::SetKey {
                key: "key".to_string(),
            },
            DropboxCommand::AuthUrl,
            DropboxCommand::Connect {
                redirect: "code".to_string(),
            },
            DropboxCommand::Disconnect,
        ] {
            assert!(!Command::Dropbox(command).needs_state());
        }
    }
}
