//! Configuration file handling.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use calview_caldav::Credentials;
use calview_core::CalviewError;
use config::{Environment, File};
use serde::Deserialize;

fn default_concurrency() -> usize {
    1
}

fn default_timeout_secs() -> u64 {
    30
}

/// Configuration at ~/.config/calview/config.toml (TOML or JSON).
///
/// Every key can be overridden with a `CALVIEW_<KEY>` environment variable.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// CalDAV server URL
    pub endpoint: Option<String>,

    pub username: Option<String>,
    pub password: Option<String>,

    /// Calendar collection paths to query; discovered from the server when empty
    #[serde(default)]
    pub calendars: Vec<String>,

    /// Number of calendars queried at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("calview");

        Ok(config_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(File::from(path).required(true))
            .add_source(Environment::with_prefix("CALVIEW"))
            .build()
            .with_context(|| format!("Failed to read {}", path.display()))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(config)
    }

    /// The configured endpoint; querying without one is refused.
    pub fn endpoint(&self, path: &Path) -> Result<&str, CalviewError> {
        self.endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| CalviewError::Config(format!("{}: no endpoint specified", path.display())))
    }

    pub fn credentials(&self) -> Option<Credentials> {
        let username = self.username.as_ref().filter(|u| !u.is_empty())?;
        Some(Credentials {
            username: username.clone(),
            password: self.password.clone().unwrap_or_default(),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
