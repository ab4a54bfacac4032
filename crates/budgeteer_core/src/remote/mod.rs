//! Remote mirror of the budget document.
//!
//! # Responsibility
//! - Define the provider contract used by the budget store for best-effort sync.
//! - Own the OAuth authorization-code plumbing shared by providers.
//!
//! # Invariants
//! - `save`/`load` never run without a bearer token; they fail with
//!   [`RemoteError::NotAuthenticated`] instead.
//! - "No remote file yet" is `Ok(None)`, not an error.
//! - Providers never retry; callers decide how to degrade.

use crate::model::budget::BudgetState;
use crate::model::ValidationError;
use crate::storage::StoreError;
use async_trait::async_trait;
use reqwest::Url;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod dropbox;

pub use dropbox::DropboxRemote;

pub type RemoteResult<T> = Result<T, RemoteError>;

#[derive(Debug)]
pub enum RemoteError {
    /// No application key has been set, so no auth URL or token exchange is possible.
    NotConfigured,
    NotAuthenticated,
    InvalidAppKey,
    /// The provider redirected back with an OAuth `error` parameter.
    AuthorizationDenied(String),
    InvalidUrl(String),
    Transport(reqwest::Error),
    Api { status: u16, body: String },
    InvalidPayload(serde_json::Error),
    InvalidState(ValidationError),
    Credentials(StoreError),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "remote app key not set"),
            Self::NotAuthenticated => write!(f, "not authenticated with remote storage"),
            Self::InvalidAppKey => write!(f, "remote app key cannot be empty"),
            Self::AuthorizationDenied(reason) => write!(f, "authorization denied: {reason}"),
            Self::InvalidUrl(message) => write!(f, "invalid url: {message}"),
            Self::Transport(err) => write!(f, "remote request failed: {err}"),
            Self::Api { status, body } => write!(f, "remote api returned {status}: {body}"),
            Self::InvalidPayload(err) => write!(f, "remote payload is not a budget document: {err}"),
            Self::InvalidState(err) => write!(f, "remote budget document is invalid: {err}"),
            Self::Credentials(err) => write!(f, "credential storage failed: {err}"),
        }
    }
}

impl Error for RemoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::InvalidPayload(err) => Some(err),
            Self::InvalidState(err) => Some(err),
            Self::Credentials(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value)
    }
}

impl From<StoreError> for RemoteError {
    fn from(value: StoreError) -> Self {
        Self::Credentials(value)
    }
}

impl From<ValidationError> for RemoteError {
    fn from(value: ValidationError) -> Self {
        Self::InvalidState(value)
    }
}

/// Provider contract for the remote single-file mirror.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Stable lowercase id used in log events.
    fn provider_id(&self) -> &'static str;

    fn has_app_key(&self) -> bool;

    fn is_authenticated(&self) -> bool;

    /// Persists the application key used for the OAuth flow.
    fn set_app_key(&self, key: &str) -> RemoteResult<()>;

    /// URL the user opens to grant access.
    fn auth_url(&self) -> RemoteResult<String>;

    /// Exchanges an authorization code for a bearer token and persists it.
    async fn authenticate(&self, code: &str) -> RemoteResult<()>;

    /// Overwrites the remote file with `state`.
    async fn save(&self, state: &BudgetState) -> RemoteResult<()>;

    /// Downloads the remote file; `None` when it does not exist yet.
    async fn load(&self) -> RemoteResult<Option<BudgetState>>;

    /// Drops the client handle and forgets all stored credentials.
    fn disconnect(&self) -> RemoteResult<()>;
}

/// Pulls the authorization code out of what the user pasted back.
///
/// Accepts either the full redirect URL (`…?code=abc`) or the bare code.
pub fn extract_auth_code(input: &str) -> RemoteResult<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(RemoteError::InvalidUrl("authorization code is empty".to_string()));
    }

    let Ok(url) = Url::parse(trimmed) else {
        return Ok(trimmed.to_string());
    };

    let mut code = None;
    let mut error = None;
    let mut error_description = None;
    for (name, value) in url.query_pairs() {
        match name.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => error_description = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(RemoteError::AuthorizationDenied(
            error_description.unwrap_or(error),
        ));
    }
    code.filter(|value| !value.is_empty()).ok_or_else(|| {
        RemoteError::InvalidUrl(format!("redirect url has no `code` parameter: {trimmed}"))
    })
}
