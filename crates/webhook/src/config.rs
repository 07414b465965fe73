//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

/// Webhook server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Public base URL this server is reachable at, used to reconstruct the
    /// signed webhook URL.
    pub base_url: String,
    /// Twilio auth token, the webhook signing secret.
    pub auth_token: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `WEBHOOK_ADDR` | Server bind address | `127.0.0.1:8787` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:forecast.db?mode=rwc` |
    /// | `WEBHOOK_BASE_URL` | Public base URL | (required) |
    /// | `TWILIO_AUTH_TOKEN` | Webhook signing secret | (required) |
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("WEBHOOK_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8787".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = env::var("SQLITE_PATH")
            .unwrap_or_else(|_| "sqlite:forecast.db?mode=rwc".to_string());

        let base_url = env::var("WEBHOOK_BASE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingBaseUrl)?;

        let auth_token = env::var("TWILIO_AUTH_TOKEN")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingAuthToken)?;

        Ok(Self {
            addr,
            database_url,
            base_url,
            auth_token,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid WEBHOOK_ADDR format")]
    InvalidAddr,

    #[error("WEBHOOK_BASE_URL environment variable is required")]
    MissingBaseUrl,

    #[error("TWILIO_AUTH_TOKEN environment variable is required")]
    MissingAuthToken,
}
