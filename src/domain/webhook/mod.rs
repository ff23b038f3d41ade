//! Webhook plumbing shared by the chat and payment consumers.

mod errors;
mod signing;

pub use errors::WebhookError;
pub use signing::{constant_time_compare, hmac_sha256_hex, verify_hex};
