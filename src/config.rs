//! Application configuration management.
//!
//! Configuration is stored at `~/.config/nregacache/config.json`; every
//! field has a default so a missing file just means defaults. The API
//! credential is never stored in the file - it comes from the
//! `MGNREGA_API_KEY` environment variable (a `.env` file works, loaded in
//! `main`).

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
const APP_NAME: &str = "nregacache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable carrying the data.gov.in API key
const API_KEY_ENV: &str = "MGNREGA_API_KEY";

/// The MGNREGA district-wise monthly progress resource
const DEFAULT_API_BASE: &str =
    "https://api.data.gov.in/resource/ee03643a-ee4c-48c2-ac30-9f2ff26ab722";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Upstream resource endpoint.
    #[serde(default = "default_api_base")]
    pub api_base_url: String,

    /// API credential. Overridden by `MGNREGA_API_KEY` when set.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Page size for upstream requests. The API rejects limit >= 1000.
    #[serde(default = "default_page_limit")]
    pub page_limit: u64,

    /// Hours a cached slice counts as fresh.
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: i64,

    /// Politeness delay between page requests, in milliseconds.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Per-request HTTP timeout, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Where cache.json and districts.json live. Defaults to the platform
    /// data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_page_limit() -> u64 {
    999
}

fn default_cache_ttl_hours() -> i64 {
    24
}

fn default_page_delay_ms() -> u64 {
    200
}

fn default_request_timeout_secs() -> u64 {
    20
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base(),
            api_key: None,
            page_limit: default_page_limit(),
            cache_ttl_hours: default_cache_ttl_hours(),
            page_delay_ms: default_page_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            data_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.api_key = Some(key.trim().to_string());
            }
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // The credential stays in the environment, not on disk.
        let mut on_disk = self.clone();
        on_disk.api_key = None;
        let contents = serde_json::to_string_pretty(&on_disk)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Resolved data directory for the file store.
    pub fn data_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.data_dir {
            return dir.clone();
        }
        dirs::data_dir()
            .map(|d| d.join(APP_NAME))
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    /// Cache TTL as a duration.
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.cache_ttl_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.page_limit, 999);
        assert_eq!(config.cache_ttl_hours, 24);
        assert_eq!(config.page_delay_ms, 200);
        assert!(config.api_key.is_none());
        assert_eq!(config.ttl(), chrono::Duration::hours(24));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"cache_ttl_hours": 6}"#).expect("partial config");
        assert_eq!(config.cache_ttl_hours, 6);
        assert_eq!(config.page_limit, 999);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE);
    }

    #[test]
    fn test_explicit_data_dir_wins() {
        let config = Config {
            data_dir: Some(PathBuf::from("/tmp/nrega-test")),
            ..Config::default()
        };
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/nrega-test"));
    }
}
