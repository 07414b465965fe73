//! Error types for the admin review API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use database::DatabaseError;
use engine::EngineError;
use thiserror::Error;

/// Errors that can occur in the admin API.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Missing or wrong admin token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Invalid request input.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Review workflow error.
    #[error("{0}")]
    Engine(#[from] EngineError),

    /// A dependent service (media host) failed.
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl AdminError {
    fn status(&self) -> StatusCode {
        match self {
            AdminError::Unauthorized => StatusCode::UNAUTHORIZED,
            AdminError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AdminError::Database(DatabaseError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AdminError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AdminError::Engine(e) => match e {
                EngineError::Database(DatabaseError::NotFound { .. }) => StatusCode::NOT_FOUND,
                EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                EngineError::MissingPlan | EngineError::MissingReceivedAmount => {
                    StatusCode::BAD_REQUEST
                }
                EngineError::OutcomeAlreadySent | EngineError::OutcomeNotReady(_) => {
                    StatusCode::CONFLICT
                }
            },
            AdminError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!("{}", message);
        }

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for admin operations.
pub type Result<T> = std::result::Result<T, AdminError>;
