//! Application configuration loaded from TOML.
//!
//! # Responsibility
//! - Describe tunables for logging and the Dropbox remote.
//! - Fall back to built-in defaults for a missing file or missing keys.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080";
pub const DEFAULT_REMOTE_FILE_PATH: &str = "/budgeteer-data.json";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://www.dropbox.com/oauth2/authorize";
pub const DEFAULT_API_URL: &str = "https://api.dropboxapi.com";
pub const DEFAULT_CONTENT_URL: &str = "https://content.dropboxapi.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgeteerConfig {
    /// One of `trace|debug|info|warn|error`; `None` picks the build default.
    pub log_level: Option<String>,
    pub dropbox: DropboxConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropboxConfig {
    /// Where Dropbox sends the browser after consent; must match the app console.
    pub redirect_uri: String,
    /// Only needed for apps registered as confidential clients.
    pub app_secret: Option<String>,
    pub file_path: String,
    pub authorize_url: String,
    pub api_url: String,
    pub content_url: String,
    /// Per-request timeout; must be at least one second.
    pub timeout_secs: u64,
}

impl Default for DropboxConfig {
    fn default() -> Self {
        Self {
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            app_secret: None,
            file_path: DEFAULT_REMOTE_FILE_PATH.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            content_url: DEFAULT_CONTENT_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Invalid { path: PathBuf, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::Invalid { path, reason } => {
                write!(f, "invalid config `{}`: {reason}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid { .. } => None,
        }
    }
}

impl BudgeteerConfig {
    /// Reads `path`, returning defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config = Self::from_toml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate().map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Rejects values that parse but cannot work at runtime.
    pub fn validate(&self) -> Result<(), String> {
        if self.dropbox.timeout_secs == 0 {
            return Err("dropbox.timeout_secs must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BudgeteerConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, BudgeteerConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let config = BudgeteerConfig::from_toml_str(
            r#"
            log_level = "debug"

            [dropbox]
            redirect_uri = "http://127.0.0.1:9999/callback"
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.dropbox.redirect_uri, "http://127.0.0.1:9999/callback");
        assert_eq!(config.dropbox.file_path, DEFAULT_REMOTE_FILE_PATH);
        assert_eq!(config.dropbox.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_level = [").unwrap();

        let err = BudgeteerConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[dropbox]\ntimeout_secs = 0\n").unwrap();

        let err = BudgeteerConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("timeout_secs"));
    }
}
