//! Configuration management for secret_sync.
//!
//! Configuration can be set via environment variables (a `.env` file in the
//! working directory is loaded first if present):
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3001`.
//! - `DATA_DIR` - Optional. Directory holding `secrets.db`. Defaults to `./data`.
//! - `GITHUB_API_URL` - Optional. GitHub REST base URL. Defaults to `https://api.github.com`.
//! - `PURGE_STALE_SECRETS` - Optional. Drop cached secrets that no longer exist remotely
//!   when listing. Defaults to `true`.
//! - `IN_MEMORY_STORE` - Optional. Keep the cache in memory only (nothing survives a
//!   restart). Defaults to `false`.

use std::path::PathBuf;
use thiserror::Error;

use crate::util::env_var_bool;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Directory for the SQLite cache
    pub data_dir: PathBuf,

    /// GitHub REST API base URL (no trailing slash)
    pub github_api_url: String,

    /// Purge cached rows for secrets deleted directly on the remote
    pub purge_stale_secrets: bool,

    /// Use the non-persistent in-memory store
    pub in_memory_store: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `PORT` or `GITHUB_API_URL` cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let github_api_url = parse_api_url(
            &std::env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| DEFAULT_GITHUB_API_URL.to_string()),
        )?;

        Ok(Self {
            host,
            port,
            data_dir,
            github_api_url,
            purge_stale_secrets: env_var_bool("PURGE_STALE_SECRETS", true),
            in_memory_store: env_var_bool("IN_MEMORY_STORE", false),
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(data_dir: PathBuf, github_api_url: &str) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            data_dir,
            github_api_url: github_api_url.trim_end_matches('/').to_string(),
            purge_stale_secrets: true,
            in_memory_store: false,
        }
    }
}

fn parse_api_url(raw: &str) -> Result<String, ConfigError> {
    let url = url::Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidValue("GITHUB_API_URL".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue(
            "GITHUB_API_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}
