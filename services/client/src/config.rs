//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// The backend mounts every route under `/api`.
const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the backend API, e.g. `http://localhost:8000/api`.
    pub api_base_url: Url,
    /// Where the bearer token is persisted between runs.
    pub token_path: PathBuf,
    pub log_level: Level,
    pub request_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Backend ---
        let api_base_url_str = std::env::var("CARELINK_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_base_url = parse_base_url(&api_base_url_str)?;

        let timeout_str =
            std::env::var("CARELINK_TIMEOUT_SECS").unwrap_or_else(|_| "30".to_string());
        let request_timeout = timeout_str
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "CARELINK_TIMEOUT_SECS".to_string(),
                    format!("'{}' is not a positive number of seconds", timeout_str),
                )
            })?;

        // --- Local State ---
        let token_path = match std::env::var("CARELINK_TOKEN_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_token_path()?,
        };

        // --- Logging ---
        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "WARN".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            api_base_url,
            token_path,
            log_level,
            request_timeout,
        })
    }
}

/// Parses the API base URL, making sure it ends with a slash so relative
/// endpoint paths join under it instead of replacing its last segment.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    let url = Url::parse(&normalized)
        .map_err(|e| ConfigError::InvalidValue("CARELINK_API_URL".to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidValue(
            "CARELINK_API_URL".to_string(),
            format!("'{}' cannot be used as a base URL", raw),
        ));
    }
    Ok(url)
}

fn default_token_path() -> Result<PathBuf, ConfigError> {
    let home = std::env::var("HOME")
        .map_err(|_| ConfigError::MissingVar("CARELINK_TOKEN_PATH or HOME".to_string()))?;
    Ok(PathBuf::from(home).join(".carelink").join("token.json"))
}
