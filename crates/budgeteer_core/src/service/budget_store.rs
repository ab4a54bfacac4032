//! Budget state container.
//!
//! # Responsibility
//! - Own the in-memory `BudgetState` and expose derived budget values.
//! - Persist every mutation locally before any remote attempt.
//! - Mirror state to the remote provider on a best-effort basis.
//!
//! # Invariants
//! - Local storage is authoritative; a failed remote push never rolls back
//!   the in-memory or local copy.
//! - In-memory state only changes once the matching local write succeeded.
//! - Replication is last-writer-wins over the whole document.

use super::sync_queue::{PendingSync, SyncOutcome, SyncQueue, SyncStatus};
use crate::model::budget::{BudgetState, DailyBudget};
use crate::model::transaction::{NewTransaction, Transaction};
use crate::model::ValidationError;
use crate::remote::{extract_auth_code, RemoteError, RemoteStore};
use crate::storage::local_state::LocalStateStore;
use crate::storage::StoreError;
use chrono::{NaiveDate, Utc};
use log::{info, warn};
use rust_decimal::Decimal;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

pub type BudgetResult<T> = Result<T, BudgetError>;

#[derive(Debug)]
pub enum BudgetError {
    Local(StoreError),
    Remote(RemoteError),
    Validation(ValidationError),
}

impl Display for BudgetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(err) => write!(f, "local storage: {err}"),
            Self::Remote(err) => write!(f, "remote storage: {err}"),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BudgetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Local(err) => Some(err),
            Self::Remote(err) => Some(err),
            Self::Validation(err) => Some(err),
        }
    }
}

impl From<StoreError> for BudgetError {
    fn from(value: StoreError) -> Self {
        Self::Local(value)
    }
}

impl From<RemoteError> for BudgetError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

impl From<ValidationError> for BudgetError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Where [`BudgetStore::initialize`] took its state from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    Local,
    /// Nothing stored anywhere; built-in defaults stay in place.
    Default,
}

pub struct BudgetStore {
    state: BudgetState,
    local: LocalStateStore,
    remote: Arc<dyn RemoteStore>,
    status: Arc<SyncStatus>,
    queue: SyncQueue,
}

impl BudgetStore {
    /// Creates a store holding the default budget. Call [`Self::initialize`]
    /// to pull persisted state.
    pub fn new(local: LocalStateStore, remote: Arc<dyn RemoteStore>) -> Self {
        let status = Arc::new(SyncStatus::default());
        let queue = SyncQueue::new(Arc::clone(&remote), Arc::clone(&status));
        Self {
            state: BudgetState::default(),
            local,
            remote,
            status,
            queue,
        }
    }

    /// Loads state: remote first when authenticated, then local storage.
    ///
    /// Remote data, when present, replaces local storage. Any remote failure
    /// falls back to local; a malformed local blob is returned as an error.
    pub async fn initialize(&mut self) -> BudgetResult<LoadSource> {
        let started_at = Instant::now();
        let status = Arc::clone(&self.status);
        let _loading = status.begin();

        if self.remote.is_authenticated() {
            match self.remote.load().await {
                Ok(Some(remote_state)) => {
                    self.local.save(&remote_state)?;
                    status.set_last_sync(remote_state.last_sync.clone());
                    self.state = remote_state;
                    info!(
                        "event=store_init module=service status=ok source=remote duration_ms={}",
                        started_at.elapsed().as_millis()
                    );
                    return Ok(LoadSource::Remote);
                }
                Ok(None) => {
                    info!("event=store_init module=service status=fallback reason=remote_empty");
                }
                Err(err) => {
                    warn!(
                        "event=store_init module=service status=fallback reason=remote_failed error={err}"
                    );
                }
            }
        }

        let source = match self.local.load()? {
            Some(local_state) => {
                status.set_last_sync(local_state.last_sync.clone());
                self.state = local_state;
                LoadSource::Local
            }
            None => LoadSource::Default,
        };
        info!(
            "event=store_init module=service status=ok source={} duration_ms={}",
            match source {
                LoadSource::Local => "local",
                _ => "default",
            },
            started_at.elapsed().as_millis()
        );
        Ok(source)
    }

    pub fn state(&self) -> &BudgetState {
        &self.state
    }

    pub fn daily_budget(&self) -> &DailyBudget {
        &self.state.daily_budget
    }

    /// Most recent first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.state.transactions
    }

    /// Transactions dated today (UTC).
    pub fn todays_transactions(&self) -> Vec<&Transaction> {
        self.transactions_on(today())
    }

    pub fn transactions_on(&self, day: NaiveDate) -> Vec<&Transaction> {
        self.state.transactions_on(day).collect()
    }

    /// Daily amount minus everything spent today (UTC).
    pub fn remaining_budget(&self) -> Decimal {
        self.remaining_budget_on(today())
    }

    pub fn remaining_budget_on(&self, day: NaiveDate) -> Decimal {
        self.state.remaining_on(day)
    }

    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }

    pub fn last_sync_time(&self) -> Option<String> {
        self.status.last_sync()
    }

    pub fn is_authenticated(&self) -> bool {
        self.remote.is_authenticated()
    }

    pub fn has_remote_app_key(&self) -> bool {
        self.remote.has_app_key()
    }

    /// Records a transaction at the head of the list.
    ///
    /// The returned handle resolves once the remote push finishes; it is
    /// already [`SyncOutcome::Skipped`] when no remote session is active.
    pub async fn add_transaction(
        &mut self,
        input: NewTransaction,
    ) -> BudgetResult<(Transaction, PendingSync)> {
        let transaction = Transaction::create(input, Utc::now())?;

        let mut next = self.state.clone();
        next.transactions.insert(0, transaction.clone());
        self.commit(next)?;

        info!(
            "event=transaction_add module=service status=ok transactions={}",
            self.state.transactions.len()
        );
        Ok((transaction, self.schedule_sync()))
    }

    pub async fn update_daily_budget(&mut self, amount: Decimal) -> BudgetResult<PendingSync> {
        let mut next = self.state.clone();
        next.daily_budget.set_amount(amount)?;
        self.commit(next)?;

        info!("event=budget_update module=service status=ok");
        Ok(self.schedule_sync())
    }

    /// Pushes the current state and waits for the outcome.
    pub async fn sync_now(&mut self) -> BudgetResult<SyncOutcome> {
        if !self.remote.is_authenticated() {
            return Err(RemoteError::NotAuthenticated.into());
        }
        Ok(self.queue.enqueue(self.state.clone()).wait().await)
    }

    pub fn set_remote_app_key(&self, key: &str) -> BudgetResult<()> {
        Ok(self.remote.set_app_key(key)?)
    }

    pub fn remote_auth_url(&self) -> BudgetResult<String> {
        Ok(self.remote.auth_url()?)
    }

    /// Completes the OAuth redirect (full URL or bare code), then reloads
    /// state so remote data takes over when it exists.
    pub async fn handle_remote_redirect(&mut self, redirect: &str) -> BudgetResult<LoadSource> {
        let code = extract_auth_code(redirect)?;
        self.remote.authenticate(&code).await?;
        self.initialize().await
    }

    pub fn disconnect_remote(&self) -> BudgetResult<()> {
        Ok(self.remote.disconnect()?)
    }

    fn commit(&mut self, next: BudgetState) -> BudgetResult<()> {
        self.local.save(&next)?;
        self.state = next;
        Ok(())
    }

    fn schedule_sync(&mut self) -> PendingSync {
        if !self.remote.is_authenticated() {
            return PendingSync::skipped();
        }
        self.queue.enqueue(self.state.clone())
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
