//! Review action routes.
//!
//! Each action responds 200 once the state mutation committed, with
//! `delivered` / `delivery_error` carrying the outbound-send outcome so the
//! dashboard can show "saved but message failed" instead of pretending
//! nothing happened.

use axum::extract::{Path, State};
use axum::Json;
use engine::{ActionReport, RejectionRequest};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::state::AppState;

/// Action response: the mutation committed; delivery may not have.
#[derive(Serialize)]
pub struct ActionResponse {
    pub ok: bool,
    pub delivered: bool,
    pub delivery_error: Option<String>,
}

impl From<ActionReport> for ActionResponse {
    fn from(report: ActionReport) -> Self {
        Self {
            ok: true,
            delivered: report.delivered,
            delivery_error: report.delivery_error,
        }
    }
}

/// Request body for sending the reading outcome.
#[derive(Debug, Deserialize)]
pub struct OutcomeRequest {
    pub text: String,
    #[serde(default)]
    pub force_resend: bool,
}

/// Approve a user's payment.
pub async fn verify(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ActionResponse>> {
    let report = state.review.verify(&user_id).await?;
    info!(user = %user_id, delivered = report.delivered, "verify action");
    Ok(Json(report.into()))
}

/// Reject a user's payment.
pub async fn reject(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<RejectionRequest>,
) -> Result<Json<ActionResponse>> {
    let report = state.review.reject(&user_id, &request).await?;
    info!(user = %user_id, reason = ?request.reason, delivered = report.delivered, "reject action");
    Ok(Json(report.into()))
}

/// Close a user out after their reading was delivered.
pub async fn complete(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ActionResponse>> {
    let report = state.review.complete(&user_id).await?;
    info!(user = %user_id, delivered = report.delivered, "complete action");
    Ok(Json(report.into()))
}

/// Send (or explicitly resend) the reading outcome text.
pub async fn outcome(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<OutcomeRequest>,
) -> Result<Json<ActionResponse>> {
    let report = state
        .review
        .send_reading_outcome(&user_id, &request.text, request.force_resend)
        .await?;
    info!(
        user = %user_id,
        delivered = report.delivered,
        force_resend = request.force_resend,
        "outcome action"
    );
    Ok(Json(report.into()))
}
