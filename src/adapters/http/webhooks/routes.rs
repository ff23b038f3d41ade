//! Axum router for the inbound webhooks.
//!
//! No user authentication here: the chat endpoint is verified by the
//! handshake and `X-Hub-Signature-256`, payments by the provider signature.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{handle_chat_webhook, handle_payment_webhook, verify_chat_webhook};
use crate::adapters::http::AppState;

/// # Routes
/// - `GET /chat` - subscription handshake
/// - `POST /chat` - inbound chat messages
/// - `POST /payments` - payment provider notifications
pub fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route("/chat", get(verify_chat_webhook).post(handle_chat_webhook))
        .route("/payments", post(handle_payment_webhook))
}
