//! Twilio REST client.

use std::time::Duration;

use async_trait::async_trait;
use engine::{is_trusted_media_url, OutboundSender, SendError};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::TwilioConfig;
use crate::error::GatewayError;

/// Max body length per WhatsApp message (Twilio limit 4096; use 4000 to be
/// safe).
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Split a long body into sendable chunks, preferring to break at the last
/// line boundary past the midpoint rather than mid-word.
pub fn chunk_message(body: &str) -> Vec<String> {
    if body.len() <= MAX_MESSAGE_LENGTH {
        return vec![body.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = body;
    while !remaining.is_empty() {
        if remaining.len() <= MAX_MESSAGE_LENGTH {
            chunks.push(remaining.to_string());
            break;
        }

        let mut limit = MAX_MESSAGE_LENGTH;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }

        let split_at = match remaining[..limit].rfind('\n') {
            Some(pos) if pos > MAX_MESSAGE_LENGTH / 2 => pos + 1,
            _ => limit,
        };

        chunks.push(remaining[..split_at].to_string());
        remaining = &remaining[split_at..];
    }
    chunks
}

/// Ensure the WhatsApp channel prefix on an address.
fn format_whatsapp_address(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.to_lowercase().starts_with("whatsapp:") {
        trimmed.to_string()
    } else {
        format!("whatsapp:{trimmed}")
    }
}

/// Client for the Twilio Messages API.
#[derive(Clone)]
pub struct TwilioClient {
    http: Client,
    config: TwilioConfig,
}

impl TwilioClient {
    /// Build a client from configuration.
    pub fn new(config: TwilioConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(GatewayError::Http)?;

        Ok(Self { http, config })
    }

    /// Build a client from environment variables.
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::new(TwilioConfig::from_env()?)
    }

    /// Get the configuration.
    pub fn config(&self) -> &TwilioConfig {
        &self.config
    }

    /// Send a WhatsApp message, chunking long bodies.
    pub async fn send_whatsapp(&self, to: &str, body: &str) -> Result<(), GatewayError> {
        let chunks = chunk_message(body);
        let total = chunks.len();

        for (i, chunk) in chunks.iter().enumerate() {
            self.post_message(to, chunk).await?;
            if total > 1 {
                debug!(to, chunk = i + 1, total, "sent message chunk");
            }
        }

        info!(to, messages = total, "whatsapp send complete");
        Ok(())
    }

    async fn post_message(&self, to: &str, body: &str) -> Result<(), GatewayError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base, self.config.account_sid
        );
        let params = [
            ("To", format_whatsapp_address(to)),
            ("From", format_whatsapp_address(&self.config.from_number)),
            ("Body", body.to_string()),
        ];

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    /// Fetch a media item with account credentials, for the admin screenshot
    /// proxy. Refuses URLs outside the trusted origin.
    pub async fn fetch_media(&self, url: &str) -> Result<(String, Vec<u8>), GatewayError> {
        if !is_trusted_media_url(url) {
            return Err(GatewayError::UntrustedMediaUrl(url.to_string()));
        }

        let response = self
            .http
            .get(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = response.bytes().await?.to_vec();

        Ok((content_type, bytes))
    }
}

#[async_trait]
impl OutboundSender for TwilioClient {
    async fn send_to_user(&self, address: &str, text: &str) -> Result<(), SendError> {
        self.send_whatsapp(address, text).await.map_err(|e| {
            warn!(address, error = %e, "whatsapp delivery failed");
            SendError(e.to_string())
        })
    }
}

impl std::fmt::Debug for TwilioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioClient")
            .field("account_sid", &self.config.account_sid)
            .field("from_number", &self.config.from_number)
            .finish()
    }
}
