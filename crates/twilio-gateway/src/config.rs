//! Twilio configuration loaded from environment variables.

use std::env;

/// Default Twilio REST API base.
pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// Twilio account configuration.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    /// Account SID.
    pub account_sid: String,
    /// Auth token, also the webhook signing secret.
    pub auth_token: String,
    /// WhatsApp sender number (with or without the `whatsapp:` prefix).
    pub from_number: String,
    /// REST API base URL.
    pub api_base: String,
}

impl TwilioConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `TWILIO_ACCOUNT_SID` | Account SID | (required) |
    /// | `TWILIO_AUTH_TOKEN` | Auth token / signing secret | (required) |
    /// | `TWILIO_WHATSAPP_FROM` | WhatsApp sender number | (required) |
    /// | `TWILIO_API_BASE` | REST API base URL | `https://api.twilio.com` |
    ///
    /// Missing credentials fail here, at startup, rather than on the first
    /// send.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            account_sid: require("TWILIO_ACCOUNT_SID")?,
            auth_token: require("TWILIO_AUTH_TOKEN")?,
            from_number: require("TWILIO_WHATSAPP_FROM")?,
            api_base: env::var("TWILIO_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(&'static str),
}
