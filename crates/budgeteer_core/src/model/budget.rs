//! Daily budget configuration and the persisted `BudgetState` envelope.

use super::transaction::{Transaction, TransactionId};
use super::{check_amount, normalize_amount, ValidationError};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_DAILY_AMOUNT: i64 = 50;
pub const DEFAULT_CURRENCY: &str = "USD";

/// Spending threshold per calendar day. `currency` is a display label only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBudget {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
}

impl Default for DailyBudget {
    fn default() -> Self {
        Self {
            amount: Decimal::from(DEFAULT_DAILY_AMOUNT),
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

/// The whole budget document. Serialized with camelCase keys
/// (`dailyBudget`, `transactions`, `lastSync`) for both local and remote copies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetState {
    pub daily_budget: DailyBudget,
    /// Most recent first.
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<String>,
}

impl DailyBudget {
    /// Replaces the amount, normalized the same way transaction amounts are.
    pub fn set_amount(&mut self, amount: Decimal) -> Result<(), ValidationError> {
        self.amount = normalize_amount(amount)?;
        Ok(())
    }
}

impl BudgetState {
    /// Checks amounts, id uniqueness, transaction dates and the currency label.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.daily_budget.currency.trim().is_empty() {
            return Err(ValidationError::EmptyCurrency);
        }
        check_amount(self.daily_budget.amount)?;

        let mut seen: HashSet<TransactionId> = HashSet::with_capacity(self.transactions.len());
        for transaction in &self.transactions {
            transaction.validate()?;
            if !seen.insert(transaction.id) {
                return Err(ValidationError::DuplicateTransactionId(transaction.id));
            }
        }
        Ok(())
    }

    pub fn transactions_on(&self, day: NaiveDate) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().filter(move |t| t.is_on(day))
    }

    /// Saturates at the `Decimal` bounds instead of overflowing.
    pub fn spent_on(&self, day: NaiveDate) -> Decimal {
        self.transactions_on(day)
            .fold(Decimal::ZERO, |total, t| total.saturating_add(t.amount))
    }

    /// Budget left for `day`; negative once overspent.
    pub fn remaining_on(&self, day: NaiveDate) -> Decimal {
        self.daily_budget.amount.saturating_sub(self.spent_on(day))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Two-space indented form written to the remote file.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
