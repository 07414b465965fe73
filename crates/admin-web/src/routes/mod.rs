//! Route handlers for the admin review API.

pub mod actions;
pub mod dashboard;
pub mod health;
pub mod payments;
pub mod users;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::auth::require_admin_token;
use crate::state::AppState;

/// Build the router with all routes.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // Review actions
        .route("/verify/:user_id", post(actions::verify))
        .route("/reject/:user_id", post(actions::reject))
        .route("/complete/:user_id", post(actions::complete))
        .route("/outcome/:user_id", post(actions::outcome))
        // Listings
        .route("/stats", get(dashboard::stats_api))
        .route("/users", get(users::list))
        .route("/users/:user_id/profile", get(users::profile))
        .route("/payments", get(payments::list))
        .route("/payments/:payment_id/screenshot", get(payments::screenshot))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_token,
        ));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .with_state(state)
}
