//! Application state shared across handlers.

use std::sync::Arc;

use database::Database;
use engine::ReviewService;
use twilio_gateway::TwilioClient;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// Review workflow bound to the WhatsApp sender.
    pub review: Arc<ReviewService<TwilioClient>>,
    /// Twilio client for authenticated media fetches.
    pub twilio: TwilioClient,
    /// Admin API token.
    pub admin_token: Arc<String>,
}

impl AppState {
    /// Create new application state.
    pub fn new(db: Database, twilio: TwilioClient, admin_token: String) -> Self {
        let review = Arc::new(ReviewService::new(db.clone(), twilio.clone()));
        Self {
            db,
            review,
            twilio,
            admin_token: Arc::new(admin_token),
        }
    }
}
