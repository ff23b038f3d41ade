//! Webhook handlers.
//!
//! Both consumers follow the same shape: record the raw call, verify,
//! process, write the outcome. Failures come back as a [`WebhookRejection`]
//! whose error decides the HTTP status the sender sees.
//!
//! - `EventLogService` - record and conclude inbound events
//! - `HandleChatWebhookHandler` - chat messages to orders
//! - `HandlePaymentWebhookHandler` - the payment reconciler

mod event_log_service;
mod handle_chat_webhook;
mod handle_payment_webhook;

pub use event_log_service::{EventLogService, WebhookRejection};
pub use handle_chat_webhook::{
    HandleChatWebhookCommand, HandleChatWebhookHandler, HandleChatWebhookResult, MessageOutcome,
};
pub use handle_payment_webhook::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandlePaymentWebhookResult,
    PaymentReconcilerDeps,
};
