//! Payment review-queue routes.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use database::{payment, PaymentWithUser};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AdminError, Result};
use crate::routes::users::parse_service;
use crate::state::AppState;

/// Listing filters.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub service: Option<String>,
}

/// Unverified payments with their users.
#[derive(Serialize)]
pub struct ListResponse {
    pub payments: Vec<PaymentWithUser>,
}

/// List the unverified payment queue.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>> {
    let service = query.service.as_deref().map(parse_service).transpose()?;
    let payments = payment::list_unverified(state.db.pool(), service).await?;
    Ok(Json(ListResponse { payments }))
}

/// Proxy the payment screenshot with account credentials, so the dashboard
/// never needs them.
pub async fn screenshot(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Response> {
    let payment = payment::get_by_id(state.db.pool(), &payment_id).await?;

    let (content_type, bytes) = state
        .twilio
        .fetch_media(&payment.screenshot_url)
        .await
        .map_err(|e| AdminError::Upstream(e.to_string()))?;

    info!(payment = %payment_id, bytes = bytes.len(), "proxied screenshot");
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
