//! HTTP adapter for inbound webhooks.
//!
//! - `GET /webhooks/chat` - verification handshake
//! - `POST /webhooks/chat` - chat message webhook
//! - `POST /webhooks/payments` - payment provider webhook

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{capture_headers, WebhookApiError, CAPTURED_HEADERS};
pub use routes::webhook_routes;
