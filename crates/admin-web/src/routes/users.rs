//! User listing and profile routes.

use axum::extract::{Path, Query, State};
use axum::Json;
use database::{
    conversation, payment, user, Conversation, Payment, PaymentLog, ServiceType, User, UserStatus,
};
use serde::{Deserialize, Serialize};

use crate::error::{AdminError, Result};
use crate::state::AppState;

/// Listing filters.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub service: Option<String>,
}

/// User listing response.
#[derive(Serialize)]
pub struct ListResponse {
    pub users: Vec<User>,
}

/// A user with their conversation, current payment and submission history.
#[derive(Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub conversation: Option<Conversation>,
    pub latest_payment: Option<Payment>,
    pub payment_logs: Vec<PaymentLog>,
}

pub(crate) fn parse_status(value: &str) -> Result<UserStatus> {
    UserStatus::parse(value).ok_or_else(|| AdminError::BadRequest(format!("Invalid status: {value}")))
}

pub(crate) fn parse_service(value: &str) -> Result<ServiceType> {
    ServiceType::parse(value)
        .ok_or_else(|| AdminError::BadRequest(format!("Invalid service type: {value}")))
}

/// List users, optionally filtered by status and service type.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let service = query.service.as_deref().map(parse_service).transpose()?;

    let users = user::list_users(state.db.pool(), status, service).await?;
    Ok(Json(ListResponse { users }))
}

/// Everything the review screen needs for one user.
pub async fn profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProfileResponse>> {
    let pool = state.db.pool();

    let user = user::get_user(pool, &user_id).await?;
    let conversation = conversation::get_by_user_id(pool, &user_id).await?;
    let latest_payment = payment::get_latest_by_user_id(pool, &user_id).await?;
    let payment_logs = payment::list_logs_by_user_id(pool, &user_id).await?;

    Ok(Json(ProfileResponse {
        user,
        conversation,
        latest_payment,
        payment_logs,
    }))
}
