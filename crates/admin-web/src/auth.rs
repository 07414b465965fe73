//! Admin token authentication middleware.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use crate::error::AdminError;
use crate::state::AppState;

fn token_matches(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Require a valid token in `X-Admin-Token` or as a bearer token.
pub async fn require_admin_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AdminError> {
    let headers = request.headers();
    let header_token = headers.get("X-Admin-Token").and_then(|v| v.to_str().ok());
    let bearer_token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let token = header_token.or(bearer_token).unwrap_or("").trim();
    if token.is_empty() || !token_matches(token, &state.admin_token) {
        return Err(AdminError::Unauthorized);
    }

    Ok(next.run(request).await)
}
