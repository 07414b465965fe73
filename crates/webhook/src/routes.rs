//! Webhook route handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use engine::{Engine, InboundMessage};
use tracing::{error, info, warn};
use twilio_gateway::validate_signature;

/// Shared webhook state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    /// Webhook signing secret (the Twilio auth token).
    pub auth_token: String,
    /// Public base URL, without a trailing slash.
    pub base_url: String,
}

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/webhook/whatsapp", post(whatsapp))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Map validated webhook params onto the engine's inbound contract.
/// Returns `None` when the sender address is missing.
fn inbound_from_params(params: &BTreeMap<String, String>) -> Option<InboundMessage> {
    let from = params.get("From").filter(|v| !v.is_empty())?.clone();
    let body = params.get("Body").cloned();
    let media_count = params
        .get("NumMedia")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);
    let media_url = params.get("MediaUrl0").cloned();

    Some(InboundMessage {
        from,
        body,
        media_count,
        media_url,
    })
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render the reply as a TwiML messaging response.
fn twiml_reply(text: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        xml_escape(text)
    )
}

/// Inbound WhatsApp webhook. The signature is checked against the
/// reconstructed public URL before any payload field is trusted.
async fn whatsapp(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(raw_params): Form<Vec<(String, String)>>,
) -> Response {
    let signature = headers
        .get("X-Twilio-Signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let params: BTreeMap<String, String> = raw_params.into_iter().collect();
    let url = format!("{}/webhook/whatsapp", state.base_url);

    if !validate_signature(&state.auth_token, signature, &url, &params) {
        warn!("rejected webhook with invalid signature");
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "Invalid signature" })),
        )
            .into_response();
    }

    let Some(message) = inbound_from_params(&params) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Invalid payload" })),
        )
            .into_response();
    };

    match state.engine.handle_message(&message).await {
        Ok(reply) => {
            info!(from = %message.from, "handled inbound message");
            (
                [(header::CONTENT_TYPE, "text/xml")],
                twiml_reply(&reply.text),
            )
                .into_response()
        }
        Err(e) => {
            // Fatal for this delivery; the transport's own redelivery is the
            // retry path.
            error!(from = %message.from, error = %e, "message processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Server error" })),
            )
                .into_response()
        }
    }
}
