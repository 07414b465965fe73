//! Gateway error types.

use thiserror::Error;

/// Errors from the Twilio transport.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Twilio API returned a non-success status.
    #[error("twilio API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Refused to fetch media from an untrusted origin.
    #[error("untrusted media url: {0}")]
    UntrustedMediaUrl(String),
}
