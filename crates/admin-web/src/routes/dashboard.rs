//! Dashboard statistics.

use axum::extract::State;
use axum::Json;
use database::{payment, submission, user};
use serde::Serialize;

use crate::error::Result;
use crate::state::AppState;

/// Aggregate counts for the dashboard header.
#[derive(Serialize)]
pub struct StatsResponse {
    /// Users per lifecycle status.
    pub users_by_status: Vec<StatusCount>,
    /// Payments waiting for review.
    pub unverified_payments: usize,
    /// Submissions whose operator notification never went out.
    pub unnotified_submissions: usize,
}

#[derive(Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Aggregate counts as JSON.
pub async fn stats_api(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let pool = state.db.pool();

    let users_by_status = user::count_by_status(pool)
        .await?
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();
    let unverified_payments = payment::list_unverified(pool, None).await?.len();
    let unnotified_submissions = submission::list_unnotified(pool).await?.len();

    Ok(Json(StatsResponse {
        users_by_status,
        unverified_payments,
        unnotified_submissions,
    }))
}
