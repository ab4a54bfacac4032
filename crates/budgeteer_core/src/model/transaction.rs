//! Spending transaction record.
//!
//! # Invariants
//! - `id` is generated client-side and never reused.
//! - `amount` is within `MAX_AMOUNT` and already holds the value a JSON
//!   round-trip would give it.
//! - `date` always begins with a valid `YYYY-MM-DD`; the remainder is free-form
//!   ISO-8601 and is kept verbatim.

use super::{check_amount, format_timestamp, normalize_amount, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TransactionId = Uuid;

const DATE_PREFIX_LEN: usize = 10;

/// One recorded spend. Positive amounts consume budget, negative amounts refund it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub date: String,
}

/// User input for a transaction that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub amount: Decimal,
    pub description: String,
    pub category: Option<String>,
    /// Defaults to the creation instant when `None` or blank.
    pub date: Option<String>,
}

impl NewTransaction {
    pub fn new(amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            amount,
            description: description.into(),
            category: None,
            date: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }
}

impl Transaction {
    /// Materializes `input` with a fresh id, stamping `now` when no date was given.
    ///
    /// Blank categories are dropped rather than stored as empty labels.
    /// The amount is normalized with [`normalize_amount`].
    pub fn create(input: NewTransaction, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let date = match input.date.map(|value| value.trim().to_string()) {
            Some(value) if !value.is_empty() => value,
            _ => format_timestamp(now),
        };
        let category = input
            .category
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let transaction = Self {
            id: Uuid::new_v4(),
            amount: normalize_amount(input.amount)?,
            description: input.description,
            category,
            date,
        };
        transaction.validate()?;
        Ok(transaction)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_amount(self.amount)?;
        self.day()
            .map(|_| ())
            .ok_or_else(|| ValidationError::InvalidDate(self.date.clone()))
    }

    /// Calendar day this transaction counts against.
    pub fn day(&self) -> Option<NaiveDate> {
        let prefix = self.date.get(..DATE_PREFIX_LEN)?;
        NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
    }

    pub fn is_on(&self, day: NaiveDate) -> bool {
        self.day() == Some(day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap()
    }

    #[test]
    fn create_defaults_date_to_now() {
        let tx = Transaction::create(NewTransaction::new(dec!(4.20), "bus"), fixed_now()).unwrap();
        assert_eq!(tx.date, "2026-10-19T09:30:00.000Z");
        assert_eq!(tx.day(), NaiveDate::from_ymd_opt(2026, 10, 19));
    }

    #[test]
    fn create_keeps_explicit_date_verbatim() {
        let input = NewTransaction::new(dec!(3), "tea").with_date(" 2026-10-01 ");
        let tx = Transaction::create(input, fixed_now()).unwrap();
        assert_eq!(tx.date, "2026-10-01");
    }

    #[test]
    fn create_drops_blank_category() {
        let input = NewTransaction::new(dec!(3), "tea").with_category("   ");
        let tx = Transaction::create(input, fixed_now()).unwrap();
        assert_eq!(tx.category, None);
    }

    #[test]
    fn create_rejects_unparseable_date() {
        let input = NewTransaction::new(dec!(3), "tea").with_date("yesterday");
        let err = Transaction::create(input, fixed_now()).unwrap_err();
        assert_eq!(err, ValidationError::InvalidDate("yesterday".to_string()));
    }

    #[test]
    fn create_generates_distinct_ids() {
        let a = Transaction::create(NewTransaction::new(dec!(1), "a"), fixed_now()).unwrap();
        let b = Transaction::create(NewTransaction::new(dec!(1), "b"), fixed_now()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn serializes_amount_as_json_number_and_omits_missing_category() {
        let tx = Transaction {
            id: Uuid::nil(),
            amount: dec!(12.50),
            description: "coffee".to_string(),
            category: None,
            date: "2026-10-19".to_string(),
        };
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["amount"], serde_json::json!(12.5));
        assert!(value.get("category").is_none());
    }

    #[test]
    fn create_rounds_amount_to_its_stored_value() {
        let input = NewTransaction::new(dec!(0.12345678901234567891), "sub-cent");
        let tx = Transaction::create(input, fixed_now()).unwrap();

        let raw = serde_json::to_string(&tx).unwrap();
        let stored: Transaction = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored, tx);
    }

    #[test]
    fn create_rejects_amount_beyond_range() {
        let input = NewTransaction::new(Decimal::MAX, "everything");
        let err = Transaction::create(input, fixed_now()).unwrap_err();
        assert_eq!(err, ValidationError::AmountOutOfRange(Decimal::MAX));
    }
}
