//! Admin review API for the consultation bot.
//!
//! Token-authenticated endpoints for the operator dashboard: the unverified
//! payment queue, user profiles, verify/reject/complete actions, and
//! reading-outcome delivery.

mod auth;
mod config;
mod error;
mod routes;
mod state;

use database::Database;
use tracing::info;
use twilio_gateway::TwilioClient;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting admin API server");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    // WhatsApp sender; credentials are required up front.
    let twilio = TwilioClient::from_env()?;

    // Build application state
    let state = AppState::new(db, twilio, config.admin_token.clone());

    // Build router
    let app = routes::router(state);

    // Start server
    info!(addr = %config.addr, "Admin API server listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
