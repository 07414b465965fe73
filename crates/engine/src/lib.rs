//! Conversation engine for the consultation bot.
//!
//! This crate owns the deterministic, persistence-backed state machine that
//! drives the chat flow, plus the operator-side review actions.
//!
//! # Architecture
//!
//! ```text
//! Inbound webhook message
//!          ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         ENGINE                              │
//! │                                                             │
//! │  1. Normalize (trim, control tokens, vetted media)          │
//! │         ↓                                                   │
//! │  2. Load user + conversation from the store                 │
//! │         ↓                                                   │
//! │  3. Global rules: terminal status → fixed prompt,           │
//! │     "00"/"menu" → reset, "0"/"back" → rewind,               │
//! │     media in payment steps → screenshot handler             │
//! │         ↓                                                   │
//! │  4. Per-step transition (guarded write, re-prompt on        │
//! │     invalid input)                                          │
//! │         ↓                                                   │
//! │  5. Reply text back to the transport                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The operator workflow ([`ReviewService`]) runs against the same store
//! from the admin surface: verify / reject / complete / send outcome, each
//! committing its mutations before a best-effort send whose failure is
//! reported, not rolled back.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use database::Database;
//! use engine::{Engine, InboundMessage, NoOpAdminNotifier};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite:forecast.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let engine = Engine::new(db, Arc::new(NoOpAdminNotifier));
//!     let reply = engine
//!         .handle_message(&InboundMessage {
//!             from: "+233541234567".to_string(),
//!             body: Some("hi".to_string()),
//!             media_count: 0,
//!             media_url: None,
//!         })
//!         .await?;
//!
//!     println!("{}", reply.text);
//!     Ok(())
//! }
//! ```

mod error;
mod machine;
mod normalizer;
mod notify;
mod review;
mod sender;

pub mod prompts;

// Public exports
pub use error::EngineError;
pub use machine::{next_collection_step, parse_plan, BotReply, Engine, InboundMessage};
pub use normalizer::{is_trusted_media_url, normalize, NormalizedMessage, TRUSTED_MEDIA_PREFIX};
pub use notify::{
    run_submission_notify, spawn_submission_notify, AdminNotifier, NoOpAdminNotifier, NotifyError,
    SubmissionNotice,
};
pub use review::{expected_amount_for_plan, ActionReport, RejectionRequest, ReviewService};
pub use sender::{LoggingSender, NoOpSender, OutboundSender, SendError};

// Re-export commonly used types from the store
pub use database::{Database, ServiceType, Step, UserStatus};
