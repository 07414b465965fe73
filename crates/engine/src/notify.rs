//! Operator notification side-channel.
//!
//! When a submission lands, the engine fires a background task that calls
//! the configured [`AdminNotifier`] with a short retry schedule. The task is
//! detached from the chat reply: its failures are logged and left on the
//! submission row (`admin_notified` stays false) so a later sweep of
//! `submission::list_unnotified` can pick them up.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use database::{conversation, payment, submission, user, Database, ServiceType, Submission};
use thiserror::Error;
use tracing::{error, info, warn};

/// A failed notification attempt.
#[derive(Debug, Error)]
#[error("admin notification failed: {0}")]
pub struct NotifyError(pub String);

/// Summary of a finished submission, handed to the notifier.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubmissionNotice {
    pub submission_id: String,
    pub phone: String,
    pub service_type: ServiceType,
    pub selected_plan: Option<String>,
    pub full_name: Option<String>,
    pub screenshot_url: String,
    pub created_at: String,
}

/// Trait for notifying operators of a new submission.
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    async fn notify_submission(&self, notice: &SubmissionNotice) -> Result<(), NotifyError>;
}

/// A notifier that does nothing. Used in tests and when no notification
/// endpoint is configured.
#[derive(Debug, Clone, Default)]
pub struct NoOpAdminNotifier;

#[async_trait]
impl AdminNotifier for NoOpAdminNotifier {
    async fn notify_submission(&self, _notice: &SubmissionNotice) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Delays between notification attempts. Three tries total.
const RETRY_DELAYS: [Duration; 2] = [Duration::from_secs(2), Duration::from_secs(10)];

/// Spawn the notification task for a submission.
pub fn spawn_submission_notify(db: Database, admin: Arc<dyn AdminNotifier>, submission_id: String) {
    tokio::spawn(async move {
        run_submission_notify(&db, admin.as_ref(), &submission_id).await;
    });
}

/// Notify operators about a submission, with retries. Checks the
/// `admin_notified` flag first so repeated invocations stay at-most-once,
/// and flips it only after a successful delivery.
pub async fn run_submission_notify(db: &Database, admin: &dyn AdminNotifier, submission_id: &str) {
    let pool = db.pool();

    let sub = match submission::get(pool, submission_id).await {
        Ok(sub) => sub,
        Err(e) => {
            error!(submission = submission_id, error = %e, "cannot load submission to notify");
            return;
        }
    };
    if sub.admin_notified {
        return;
    }

    let notice = match build_notice(db, &sub).await {
        Ok(notice) => notice,
        Err(e) => {
            error!(submission = submission_id, error = %e, "cannot assemble submission notice");
            return;
        }
    };

    let attempts = RETRY_DELAYS.len() + 1;
    for attempt in 1..=attempts {
        match admin.notify_submission(&notice).await {
            Ok(()) => {
                if let Err(e) = submission::mark_admin_notified(pool, submission_id).await {
                    error!(submission = submission_id, error = %e, "notified but could not flip flag");
                }
                info!(submission = submission_id, attempt, "operators notified");
                return;
            }
            Err(e) => {
                warn!(submission = submission_id, attempt, error = %e, "notification attempt failed");
                if let Some(delay) = RETRY_DELAYS.get(attempt - 1) {
                    tokio::time::sleep(*delay).await;
                }
            }
        }
    }

    error!(
        submission = submission_id,
        attempts, "giving up on admin notification; left unnotified for a later sweep"
    );
}

async fn build_notice(db: &Database, sub: &Submission) -> database::Result<SubmissionNotice> {
    let pool = db.pool();
    let user = user::get_user(pool, &sub.user_id).await?;
    let conv = conversation::get(pool, &sub.conversation_id).await?;
    let pay = payment::get_by_id(pool, &sub.payment_id).await?;

    Ok(SubmissionNotice {
        submission_id: sub.id.clone(),
        phone: user.phone,
        service_type: user.service_type,
        selected_plan: user.selected_plan,
        full_name: conv.profile.full_name,
        screenshot_url: pay.screenshot_url,
        created_at: sub.created_at.clone(),
    })
}
