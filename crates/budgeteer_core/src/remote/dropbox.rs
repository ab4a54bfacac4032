//! Dropbox provider for the remote budget mirror.
//!
//! # Responsibility
//! - Drive the OAuth authorization-code exchange against Dropbox.
//! - Upload and download the single budget file over the Dropbox HTTP API.
//!
//! # Invariants
//! - The token and app key are read from credential storage once at
//!   construction and written back on every change.
//! - Downloads answering 409 mean the file does not exist yet.

use super::{RemoteError, RemoteResult, RemoteStore};
use crate::config::DropboxConfig;
use crate::model::budget::BudgetState;
use crate::storage::credentials::CredentialStore;
use async_trait::async_trait;
use log::{error, info, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

const PROVIDER_ID: &str = "dropbox";
const API_ARG_HEADER: &str = "Dropbox-API-Arg";

#[derive(Debug, Default)]
struct Session {
    app_key: Option<String>,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct DropboxRemote {
    config: DropboxConfig,
    credentials: CredentialStore,
    http: Client,
    session: RwLock<Session>,
}

impl DropboxRemote {
    /// Builds the provider, restoring any token and app key saved by earlier runs.
    pub fn new(config: DropboxConfig, credentials: CredentialStore) -> RemoteResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        let session = Session {
            app_key: credentials.app_key()?,
            access_token: credentials.access_token()?,
        };

        info!(
            "event=remote_init module=remote provider={PROVIDER_ID} status=ok has_app_key={} authenticated={}",
            session.app_key.is_some(),
            session.access_token.is_some()
        );

        Ok(Self {
            config,
            credentials,
            http,
            session: RwLock::new(session),
        })
    }

    fn read_session(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn bearer(&self) -> RemoteResult<String> {
        self.read_session()
            .access_token
            .clone()
            .ok_or(RemoteError::NotAuthenticated)
    }

    fn endpoint(base: &str, path: &str) -> String {
        format!("{}{path}", base.trim_end_matches('/'))
    }

    fn file_arg(&self, overwrite: bool) -> String {
        if overwrite {
            json!({ "path": self.config.file_path, "mode": "overwrite" }).to_string()
        } else {
            json!({ "path": self.config.file_path }).to_string()
        }
    }
}

#[async_trait]
impl RemoteStore for DropboxRemote {
    fn provider_id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn has_app_key(&self) -> bool {
        self.read_session().app_key.is_some()
    }

    fn is_authenticated(&self) -> bool {
        self.read_session().access_token.is_some()
    }

    fn set_app_key(&self, key: &str) -> RemoteResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(RemoteError::InvalidAppKey);
        }
        self.credentials.set_app_key(key)?;
        self.write_session().app_key = Some(key.to_string());
        Ok(())
    }

    fn auth_url(&self) -> RemoteResult<String> {
        let app_key = self
            .read_session()
            .app_key
            .clone()
            .ok_or(RemoteError::NotConfigured)?;
        let url = Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("client_id", app_key.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
            ],
        )
        .map_err(|err| RemoteError::InvalidUrl(format!("{}: {err}", self.config.authorize_url)))?;
        Ok(url.into())
    }

    async fn authenticate(&self, code: &str) -> RemoteResult<()> {
        let app_key = self
            .read_session()
            .app_key
            .clone()
            .ok_or(RemoteError::NotConfigured)?;
        let started_at = Instant::now();

        let mut form = vec![
            ("code", code),
            ("grant_type", "authorization_code"),
            ("client_id", app_key.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        if let Some(secret) = self.config.app_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let result: RemoteResult<TokenResponse> = async {
            let response = self
                .http
                .post(Self::endpoint(&self.config.api_url, "/oauth2/token"))
                .form(&form)
                .send()
                .await?;
            let body = ensure_success(response).await?.text().await?;
            serde_json::from_str::<TokenResponse>(&body).map_err(RemoteError::InvalidPayload)
        }
        .await;

        let token = match result {
            Ok(token) => token.access_token,
            Err(err) => {
                error!(
                    "event=remote_auth module=remote provider={PROVIDER_ID} status=error duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                return Err(err);
            }
        };

        self.credentials.set_access_token(&token)?;
        self.write_session().access_token = Some(token);
        info!(
            "event=remote_auth module=remote provider={PROVIDER_ID} status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    async fn save(&self, state: &BudgetState) -> RemoteResult<()> {
        let token = self.bearer()?;
        let started_at = Instant::now();
        let body = state.to_pretty_json().map_err(RemoteError::InvalidPayload)?;

        let result: RemoteResult<()> = async {
            let response = self
                .http
                .post(Self::endpoint(&self.config.content_url, "/2/files/upload"))
                .bearer_auth(&token)
                .header(API_ARG_HEADER, self.file_arg(true))
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(body)
                .send()
                .await?;
            ensure_success(response).await.map(|_| ())
        }
        .await;

        match &result {
            Ok(()) => info!(
                "event=remote_save module=remote provider={PROVIDER_ID} status=ok duration_ms={} transactions={}",
                started_at.elapsed().as_millis(),
                state.transactions.len()
            ),
            Err(err) => error!(
                "event=remote_save module=remote provider={PROVIDER_ID} status=error duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    async fn load(&self) -> RemoteResult<Option<BudgetState>> {
        let token = self.bearer()?;
        let started_at = Instant::now();

        let result: RemoteResult<Option<BudgetState>> = async {
            let response = self
                .http
                .post(Self::endpoint(&self.config.content_url, "/2/files/download"))
                .bearer_auth(&token)
                .header(API_ARG_HEADER, self.file_arg(false))
                .send()
                .await?;
            if response.status() == StatusCode::CONFLICT {
                return Ok(None);
            }
            let body = ensure_success(response).await?.text().await?;
            let state = BudgetState::from_json(&body).map_err(RemoteError::InvalidPayload)?;
            state.validate()?;
            Ok(Some(state))
        }
        .await;

        match &result {
            Ok(Some(state)) => info!(
                "event=remote_load module=remote provider={PROVIDER_ID} status=ok duration_ms={} transactions={}",
                started_at.elapsed().as_millis(),
                state.transactions.len()
            ),
            Ok(None) => info!(
                "event=remote_load module=remote provider={PROVIDER_ID} status=empty duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=remote_load module=remote provider={PROVIDER_ID} status=error duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    fn disconnect(&self) -> RemoteResult<()> {
        *self.write_session() = Session::default();
        if let Err(err) = self.credentials.clear() {
            warn!("event=remote_disconnect module=remote provider={PROVIDER_ID} status=error error={err}");
            return Err(err.into());
        }
        info!("event=remote_disconnect module=remote provider={PROVIDER_ID} status=ok");
        Ok(())
    }
}

async fn ensure_success(response: Response) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Api {
        status: status.as_u16(),
        body,
    })
}
