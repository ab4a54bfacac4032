//! Local adapter for the `BudgetState` envelope.
//!
//! # Invariants
//! - The whole envelope lives under [`LOCAL_STATE_KEY`]; there is no per-field storage.
//! - Every save stamps `lastSync` with the write instant.
//! - A stored blob that cannot be parsed is an error, never a silent default.

use super::kv::KeyValueStore;
use super::{StoreError, StoreResult};
use crate::model::budget::BudgetState;
use crate::model::format_timestamp;
use chrono::Utc;
use log::{error, info};
use std::sync::Arc;

pub const LOCAL_STATE_KEY: &str = "budgeteer-state";

#[derive(Clone)]
pub struct LocalStateStore {
    kv: Arc<dyn KeyValueStore>,
}

impl LocalStateStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Writes `state` and returns the `lastSync` stamp that was stored.
    pub fn save(&self, state: &BudgetState) -> StoreResult<String> {
        let stamp = format_timestamp(Utc::now());
        let envelope = BudgetState {
            last_sync: Some(stamp.clone()),
            ..state.clone()
        };
        let raw = envelope.to_json().map_err(StoreError::Serialize)?;
        self.kv.set(LOCAL_STATE_KEY, &raw).map_err(|err| {
            error!("event=state_save module=storage status=error error={err}");
            err
        })?;

        info!(
            "event=state_save module=storage status=ok transactions={}",
            envelope.transactions.len()
        );
        Ok(stamp)
    }

    /// Returns `None` when nothing has been saved yet.
    pub fn load(&self) -> StoreResult<Option<BudgetState>> {
        let Some(raw) = self.kv.get(LOCAL_STATE_KEY)? else {
            info!("event=state_load module=storage status=empty");
            return Ok(None);
        };

        let state = BudgetState::from_json(&raw).map_err(|source| {
            error!("event=state_load module=storage status=error error_code=corrupt error={source}");
            StoreError::Corrupt {
                key: LOCAL_STATE_KEY,
                source,
            }
        })?;
        state.validate()?;

        info!(
            "event=state_load module=storage status=ok transactions={}",
            state.transactions.len()
        );
        Ok(Some(state))
    }
}
