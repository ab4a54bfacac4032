//! Persisted OAuth credentials for the remote provider.

use super::kv::KeyValueStore;
use super::StoreResult;
use std::sync::Arc;

pub const ACCESS_TOKEN_KEY: &str = "dropbox_access_token";
pub const APP_KEY_KEY: &str = "dropbox_app_key";

#[derive(Clone)]
pub struct CredentialStore {
    kv: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn access_token(&self) -> StoreResult<Option<String>> {
        self.kv.get(ACCESS_TOKEN_KEY)
    }

    pub fn set_access_token(&self, token: &str) -> StoreResult<()> {
        self.kv.set(ACCESS_TOKEN_KEY, token)
    }

    pub fn app_key(&self) -> StoreResult<Option<String>> {
        self.kv.get(APP_KEY_KEY)
    }

    pub fn set_app_key(&self, key: &str) -> StoreResult<()> {
        self.kv.set(APP_KEY_KEY, key)
    }

    /// Forgets both the token and the app key.
    pub fn clear(&self) -> StoreResult<()> {
        self.kv.remove(ACCESS_TOKEN_KEY)?;
        self.kv.remove(APP_KEY_KEY)
    }
}
