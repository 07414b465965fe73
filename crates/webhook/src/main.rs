//! Inbound WhatsApp webhook server.
//!
//! Validates each delivery's signature, runs the conversation engine, and
//! answers with a TwiML message.

mod config;
mod routes;

use std::sync::Arc;

use database::{submission, Database};
use engine::{spawn_submission_notify, AdminNotifier, Engine, NoOpAdminNotifier};
use tracing::{info, warn};
use twilio_gateway::HttpAdminNotifier;

use crate::config::Config;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting webhook server");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    // Operator notification channel, if configured
    let admin: Arc<dyn AdminNotifier> = match HttpAdminNotifier::from_env() {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            warn!(error = %e, "admin notifications disabled");
            Arc::new(NoOpAdminNotifier)
        }
    };

    // Pick up notifications that never went out (crash, outage).
    let pending = submission::list_unnotified(db.pool()).await?;
    if !pending.is_empty() {
        info!(count = pending.len(), "re-firing pending operator notifications");
        for sub in pending {
            spawn_submission_notify(db.clone(), Arc::clone(&admin), sub.id);
        }
    }

    let engine = Arc::new(Engine::new(db, admin));

    // Build application state
    let state = AppState {
        engine,
        auth_token: config.auth_token.clone(),
        base_url: config.base_url.clone(),
    };

    // Build router
    let app = routes::router().with_state(state);

    // Start server
    info!(addr = %config.addr, "Webhook server listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
