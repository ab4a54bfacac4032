//! Local persistence adapters.
//!
//! # Responsibility
//! - Provide a small key-value contract over the local SQLite database.
//! - Persist the `BudgetState` envelope and remote credentials through it.
//!
//! # Invariants
//! - Values are written whole; a key is either absent or holds a complete value.
//! - Read paths surface malformed data as errors instead of defaulting.

use crate::db::DbError;
use crate::model::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod credentials;
pub mod kv;
pub mod local_state;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// The stored value under `key` is not valid JSON for its type.
    Corrupt {
        key: &'static str,
        source: serde_json::Error,
    },
    Serialize(serde_json::Error),
    /// The stored value parsed but breaks a model invariant.
    InvalidState(ValidationError),
    /// A previous writer panicked while holding the connection.
    Poisoned,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Corrupt { key, source } => {
                write!(f, "stored value under `{key}` is malformed: {source}")
            }
            Self::Serialize(err) => write!(f, "failed to serialize value: {err}"),
            Self::InvalidState(err) => write!(f, "stored budget state is invalid: {err}"),
            Self::Poisoned => write!(f, "local store connection lock is poisoned"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Corrupt { source, .. } => Some(source),
            Self::Serialize(err) => Some(err),
            Self::InvalidState(err) => Some(err),
            Self::Poisoned => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::InvalidState(value)
    }
}
