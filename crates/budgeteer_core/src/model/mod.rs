//! Budget domain model.
//!
//! # Responsibility
//! - Define the `BudgetState` envelope persisted locally and mirrored remotely.
//! - Keep derived budget arithmetic next to the data it reads.
//!
//! # Invariants
//! - `BudgetState` is the only unit of persistence and synchronization.
//! - Transactions are immutable once created.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::error::Error;
use std::str::FromStr;
use std::fmt::{Display, Formatter};

pub mod budget;
pub mod transaction;

/// Validation failures for budget data, raised on create and on every load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Transaction date does not begin with a `YYYY-MM-DD` calendar date.
    InvalidDate(String),
    /// Two transactions share one identifier.
    DuplicateTransactionId(transaction::TransactionId),
    /// Budget currency code is blank.
    EmptyCurrency,
    /// Money amount is larger in magnitude than [`MAX_AMOUNT`].
    AmountOutOfRange(Decimal),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDate(value) => {
                write!(f, "transaction date `{value}` does not start with YYYY-MM-DD")
            }
            Self::DuplicateTransactionId(id) => write!(f, "duplicate transaction id: {id}"),
            Self::EmptyCurrency => write!(f, "budget currency cannot be empty"),
            Self::AmountOutOfRange(amount) => {
                write!(f, "amount {amount} exceeds the supported range of +/-{MAX_AMOUNT}")
            }
        }
    }
}

impl Error for ValidationError {}

/// Largest accepted magnitude for any money amount. Whole units stay exact
/// as JSON numbers below this bound.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Brings `amount` to the value it will have after a JSON write and read.
///
/// Amounts travel as JSON numbers, so anything finer than a double is
/// rounded here, before it reaches memory or storage.
pub fn normalize_amount(amount: Decimal) -> Result<Decimal, ValidationError> {
    check_amount(amount)?;
    amount
        .to_f64()
        .filter(|value| value.is_finite())
        .and_then(|value| Decimal::from_str(&value.to_string()).ok())
        .ok_or(ValidationError::AmountOutOfRange(amount))
}

pub(crate) fn check_amount(amount: Decimal) -> Result<(), ValidationError> {
    if amount.abs() > MAX_AMOUNT {
        return Err(ValidationError::AmountOutOfRange(amount));
    }
    Ok(())
}

/// Formats `at` the way persisted timestamps are written (`2026-10-19T08:15:00.000Z`).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
