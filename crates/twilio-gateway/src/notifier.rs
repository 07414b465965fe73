//! HTTP operator-notification channel.
//!
//! Posts a JSON summary of each submission to a configured endpoint (a
//! serverless mail function in production). The engine drives retries and
//! the at-most-once flag; this type only performs one delivery attempt.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use engine::{AdminNotifier, NotifyError, SubmissionNotice};
use reqwest::Client;
use tracing::debug;

use crate::config::ConfigError;
use crate::error::GatewayError;

/// Notifier that POSTs submission notices to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpAdminNotifier {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAdminNotifier {
    /// Build a notifier for an endpoint, with an optional bearer key.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(GatewayError::Http)?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    /// Build a notifier from environment variables, if configured.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `ADMIN_NOTIFY_URL` | Notification endpoint | (required) |
    /// | `ADMIN_NOTIFY_KEY` | Bearer key for the endpoint | (none) |
    pub fn from_env() -> Result<Self, GatewayError> {
        let endpoint = env::var("ADMIN_NOTIFY_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingVar("ADMIN_NOTIFY_URL"))?;
        let api_key = env::var("ADMIN_NOTIFY_KEY").ok().filter(|v| !v.trim().is_empty());
        Self::new(endpoint.trim().to_string(), api_key)
    }
}

#[async_trait]
impl AdminNotifier for HttpAdminNotifier {
    async fn notify_submission(&self, notice: &SubmissionNotice) -> Result<(), NotifyError> {
        debug!(submission = %notice.submission_id, "posting submission notice");

        let mut request = self.http.post(&self.endpoint).json(notice);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifyError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError(format!("HTTP {status}: {body}")));
        }

        Ok(())
    }
}
