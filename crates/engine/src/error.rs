//! Error types for the conversation engine.

use database::{DatabaseError, UserStatus};
use thiserror::Error;

/// Errors that can occur while processing a message or review action.
///
/// Chat-side validation failures are not errors: the machine answers them
/// with a re-prompt and moves on.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Persistence failure. Fatal for the current message or action.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Underpaid rejection on a user without a priced plan.
    #[error("user has no selected plan with a known price")]
    MissingPlan,

    /// Underpaid rejection without the amount actually received.
    #[error("received amount is required to reject as underpaid")]
    MissingReceivedAmount,

    /// Reading outcome already delivered and `force_resend` not set.
    #[error("reading outcome was already sent; set force_resend to send again")]
    OutcomeAlreadySent,

    /// Reading outcome requested before the payment was verified.
    #[error("reading outcome requires a verified or completed user, status is {0:?}")]
    OutcomeNotReady(UserStatus),
}
