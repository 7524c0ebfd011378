//! Backend configuration.
//!
//! Every field has a default so an empty JSON object is a valid config file.
//! [`Config::from_env`] layers an optional file and environment variables on
//! top of the defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Connection settings for the GRead backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Site root, without a trailing slash (default: "https://gread.fun")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Items requested per page (default: 20)
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Bearer token for authenticated endpoints
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            per_page: default_per_page(),
            timeout_secs: default_timeout_secs(),
            token: None,
        }
    }
}

fn default_base_url() -> String {
    "https://gread.fun".to_string()
}

fn default_per_page() -> u32 {
    20
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// WordPress core REST namespace.
    pub fn wp_api(&self) -> String {
        format!("{}/wp-json/wp/v2", self.base_url.trim_end_matches('/'))
    }

    /// GRead plugin REST namespace.
    pub fn custom_api(&self) -> String {
        format!("{}/wp-json/gread/v1", self.base_url.trim_end_matches('/'))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Load a JSON config file. Missing fields fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Build a config from the process environment.
    ///
    /// `GREAD_CONFIG` names an optional JSON file; `GREAD_BASE_URL`,
    /// `GREAD_PER_PAGE`, `GREAD_TIMEOUT_SECS` and `GREAD_TOKEN` override
    /// individual fields.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reads variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup("GREAD_CONFIG") {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(url) = lookup("GREAD_BASE_URL") {
            config.base_url = url;
        }
        if let Some(raw) = lookup("GREAD_PER_PAGE") {
            config.per_page = raw
                .parse()
                .map_err(|_| Error::config(format!("GREAD_PER_PAGE is not a number: {raw}")))?;
        }
        if let Some(raw) = lookup("GREAD_TIMEOUT_SECS") {
            config.timeout_secs = raw
                .parse()
                .map_err(|_| Error::config(format!("GREAD_TIMEOUT_SECS is not a number: {raw}")))?;
        }
        if let Some(token) = lookup("GREAD_TOKEN").filter(|t| !t.is_empty()) {
            config.token = Some(token);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.per_page == 0 {
            return Err(Error::config("per_page must be at least 1"));
        }
        if self.base_url.is_empty() {
            return Err(Error::config("base_url must not be empty"));
        }
        Ok(())
    }
}
