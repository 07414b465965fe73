//! Outbound sender trait and test implementations.

use async_trait::async_trait;
use thiserror::Error;

/// A failed delivery. Carries the transport's description; the state
/// mutation that preceded the send is never rolled back because of one.
#[derive(Debug, Error)]
#[error("send failed: {0}")]
pub struct SendError(pub String);

/// Trait for delivering chat messages to users.
///
/// Abstracted to support different transports (Twilio WhatsApp, tests).
/// Implementations are responsible for provider limits such as chunking
/// long messages.
#[async_trait]
pub trait OutboundSender: Send + Sync {
    /// Send a text message to a phone address.
    async fn send_to_user(&self, address: &str, text: &str) -> Result<(), SendError>;
}

/// A no-op sender for testing that discards all messages.
#[derive(Debug, Clone, Default)]
pub struct NoOpSender;

#[async_trait]
impl OutboundSender for NoOpSender {
    async fn send_to_user(&self, _address: &str, _text: &str) -> Result<(), SendError> {
        Ok(())
    }
}

/// A logging sender for debugging that logs all deliveries.
#[derive(Debug, Clone, Default)]
pub struct LoggingSender;

#[async_trait]
impl OutboundSender for LoggingSender {
    async fn send_to_user(&self, address: &str, text: &str) -> Result<(), SendError> {
        tracing::info!(address, chars = text.len(), "sending message");
        Ok(())
    }
}
