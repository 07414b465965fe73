//! Human-review actions: verify, reject, complete, send outcome.
//!
//! Every action commits its store mutations first and then attempts the
//! user-facing send. A failed send never rolls anything back; it comes back
//! as `delivered: false` with the transport's error so the operator can see
//! "saved but message failed" and retry.

use database::{conversation, payment, user, Database, RejectionReason, Step, UserStatus};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::EngineError;
use crate::prompts;
use crate::sender::OutboundSender;

/// Expected Mobile Money amount for a plan, in GHS.
pub fn expected_amount_for_plan(plan: &str) -> Option<f64> {
    match plan {
        "1 Year" => Some(1800.0),
        "3 Years" => Some(3000.0),
        "5 Years" => Some(4200.0),
        _ => None,
    }
}

/// How an action went: the mutation always committed; delivery may not have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    pub delivered: bool,
    pub delivery_error: Option<String>,
}

/// Operator input for a rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct RejectionRequest {
    pub reason: RejectionReason,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub received_amount_ghs: Option<f64>,
}

/// The operator-triggered half of the workflow. Runs in a separate
/// execution context from the bot path; the terminal statuses it writes are
/// what make the bot path a no-op afterwards.
pub struct ReviewService<S: OutboundSender> {
    db: Database,
    sender: S,
}

impl<S: OutboundSender> ReviewService<S> {
    pub fn new(db: Database, sender: S) -> Self {
        Self { db, sender }
    }

    /// Approve the user's payment and tell them.
    pub async fn verify(&self, user_id: &str) -> Result<ActionReport, EngineError> {
        let pool = self.db.pool();
        let user = user::get_user(pool, user_id).await?;

        payment::verify_latest(pool, user_id).await?;
        user::update_status(pool, user_id, UserStatus::Verified, None, None).await?;
        if let Some(conv) = conversation::get_by_user_id(pool, user_id).await? {
            conversation::set_step(pool, &conv.id, Step::VerifiedNotified).await?;
        }

        info!(user = user_id, "payment verified");
        let report = self.deliver(&user.phone, prompts::verified(user.service_type)).await;
        match &report.delivery_error {
            None => payment::mark_verified_notified(pool, user_id).await?,
            Some(e) => payment::record_notify_error(pool, user_id, e).await?,
        }
        Ok(report)
    }

    /// Reject the user's payment, park them in the payment-issue menu, and
    /// tell them why.
    pub async fn reject(
        &self,
        user_id: &str,
        request: &RejectionRequest,
    ) -> Result<ActionReport, EngineError> {
        let pool = self.db.pool();
        let user = user::get_user(pool, user_id).await?;

        // Validate up front so a bad request leaves no half-applied state.
        let amounts = match request.reason {
            RejectionReason::InvalidProof => None,
            RejectionReason::Underpaid => {
                let plan = user.selected_plan.as_deref().ok_or(EngineError::MissingPlan)?;
                let expected = expected_amount_for_plan(plan).ok_or(EngineError::MissingPlan)?;
                let received = request
                    .received_amount_ghs
                    .ok_or(EngineError::MissingReceivedAmount)?;
                Some((expected, received))
            }
        };

        if let Some(conv) = conversation::get_by_user_id(pool, user_id).await? {
            conversation::set_step(pool, &conv.id, Step::PaymentIssueMenu).await?;
        }
        user::update_status(pool, user_id, UserStatus::AwaitingPayment, None, None).await?;
        payment::reject(
            pool,
            user_id,
            request.reason,
            request.note.as_deref(),
            amounts.map(|(_, received)| received),
            amounts.map(|(expected, _)| expected),
        )
        .await?;

        info!(user = user_id, reason = ?request.reason, "payment rejected");
        let message = match amounts {
            Some((expected, received)) => prompts::underpaid_notice(expected, received),
            None => prompts::PAYMENT_REJECTED_INVALID.to_string(),
        };
        Ok(self.deliver(&user.phone, &message).await)
    }

    /// Close the user out after the reading has been delivered.
    pub async fn complete(&self, user_id: &str) -> Result<ActionReport, EngineError> {
        let pool = self.db.pool();
        let user = user::get_user(pool, user_id).await?;

        user::update_status(pool, user_id, UserStatus::Completed, None, None).await?;
        if let Some(conv) = conversation::get_by_user_id(pool, user_id).await? {
            conversation::set_step(pool, &conv.id, Step::Completed).await?;
        }

        info!(user = user_id, "user completed");
        Ok(self.deliver(&user.phone, prompts::completed(user.service_type)).await)
    }

    /// Deliver the reading outcome text. Requires a verified (or completed)
    /// user; refuses a second send unless `force_resend` is set, so a
    /// double-click cannot spam the client.
    pub async fn send_reading_outcome(
        &self,
        user_id: &str,
        text: &str,
        force_resend: bool,
    ) -> Result<ActionReport, EngineError> {
        let pool = self.db.pool();
        let user = user::get_user(pool, user_id).await?;

        if !matches!(user.status, UserStatus::Verified | UserStatus::Completed) {
            return Err(EngineError::OutcomeNotReady(user.status));
        }
        if user.reading_sent && !force_resend {
            return Err(EngineError::OutcomeAlreadySent);
        }

        user::set_reading_outcome(pool, user_id, text).await?;

        let report = self.deliver(&user.phone, text).await;
        match &report.delivery_error {
            None => user::mark_reading_sent(pool, user_id).await?,
            Some(e) => user::record_reading_send_error(pool, user_id, e).await?,
        }
        Ok(report)
    }

    async fn deliver(&self, phone: &str, text: &str) -> ActionReport {
        match self.sender.send_to_user(phone, text).await {
            Ok(()) => ActionReport {
                delivered: true,
                delivery_error: None,
            },
            Err(e) => {
                warn!(phone, error = %e, "state saved but delivery failed");
                ActionReport {
                    delivered: false,
                    delivery_error: Some(e.to_string()),
                }
            }
        }
    }
}
