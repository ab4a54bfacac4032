//! Core logic for Budgeteer, a daily spending tracker.
//!
//! State lives in a local SQLite key-value store and is optionally mirrored
//! to a single Dropbox file. This crate owns every invariant; front ends only
//! call into [`BudgetStore`].

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod remote;
pub mod service;
pub mod storage;

pub use config::{BudgeteerConfig, ConfigError, DropboxConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::budget::{BudgetState, DailyBudget};
pub use model::transaction::{NewTransaction, Transaction, TransactionId};
pub use model::ValidationError;
pub use remote::{extract_auth_code, DropboxRemote, RemoteError, RemoteResult, RemoteStore};
pub use service::budget_store::{BudgetError, BudgetResult, BudgetStore, LoadSource};
pub use service::sync_queue::{PendingSync, SyncOutcome};
pub use storage::credentials::CredentialStore;
pub use storage::kv::{KeyValueStore, SqliteKeyValueStore};
pub use storage::local_state::{LocalStateStore, LOCAL_STATE_KEY};
pub use storage::{StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
