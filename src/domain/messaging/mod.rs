//! Messaging domain module.
//!
//! - `chat_webhook` - chat platform envelope, handshake and signature
//! - `interpreter` - free text to draft order heuristic

mod chat_webhook;
mod interpreter;

pub use chat_webhook::{
    verify_hub_signature, ChatChange, ChatContact, ChatEntry, ChatMessage, ChatMetadata,
    ChatProfile, ChatStatus, ChatText, ChatValue, ChatWebhook, InboundChatMessage,
    WebhookVerifyQuery,
};
pub use interpreter::{
    interpret, DraftItem, DraftOrder, ParsedLine, ParsedMessage, PRODUCT_VOCABULARY,
};
