//! Filesystem locations for config, database and logs.

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR: &str = "budgeteer";
const CONFIG_FILE: &str = "config.toml";
const DB_FILE: &str = "budgeteer.sqlite3";
const LOG_DIR: &str = "logs";

pub struct AppPaths {
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
}

impl AppPaths {
    /// Explicit paths win; otherwise the platform data/config directories are used.
    pub fn resolve(data_dir: Option<PathBuf>, config_file: Option<PathBuf>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => absolute(dir)?,
            None => dirs::data_dir()
                .context("no platform data directory; pass --data-dir")?
                .join(APP_DIR),
        };
        let config_file = match config_file {
            Some(file) => absolute(file)?,
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
                .unwrap_or_else(|| data_dir.join(CONFIG_FILE)),
        };
        Ok(Self {
            data_dir,
            config_file,
        })
    }

    pub fn db_file(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join(LOG_DIR)
    }
}

fn absolute(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    Ok(cwd.join(path))
}
