//! Chat platform webhook envelope.
//!
//! The platform batches messages inside `entry[].changes[].value`. Only the
//! fields the engine acts on are modeled; unknown fields are ignored.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::webhook::{constant_time_compare, verify_hex, WebhookError};

/// Query string of the verification handshake.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookVerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

impl WebhookVerifyQuery {
    /// Returns the challenge to echo when the handshake is valid.
    pub fn accept(&self, expected_token: &SecretString) -> Option<&str> {
        let mode_ok = self.mode.as_deref() == Some("subscribe");
        let token_ok = self
            .verify_token
            .as_deref()
            .map(|token| {
                constant_time_compare(token.as_bytes(), expected_token.expose_secret().as_bytes())
            })
            .unwrap_or(false);

        if mode_ok && token_ok {
            self.challenge.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatWebhook {
    pub object: String,
    #[serde(default)]
    pub entry: Vec<ChatEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatEntry {
    pub id: String,
    #[serde(default)]
    pub changes: Vec<ChatChange>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatChange {
    pub field: String,
    pub value: ChatValue,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatValue {
    #[serde(default)]
    pub messaging_product: Option<String>,
    #[serde(default)]
    pub metadata: ChatMetadata,
    #[serde(default)]
    pub contacts: Vec<ChatContact>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub statuses: Vec<ChatStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatMetadata {
    pub display_phone_number: Option<String>,
    pub phone_number_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatContact {
    pub wa_id: String,
    #[serde(default)]
    pub profile: Option<ChatProfile>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatProfile {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub from: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub text: Option<ChatText>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatText {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatStatus {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub recipient_id: Option<String>,
}

/// One inbound text message, flattened out of the envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundChatMessage {
    /// Business phone-number id the message was sent to.
    pub channel_id: String,
    pub message_id: String,
    pub from: String,
    pub sender_name: Option<String>,
    pub body: String,
}

impl ChatWebhook {
    /// Parses a raw request body.
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(body).map_err(|e| WebhookError::ParseError(e.to_string()))
    }

    /// Text messages in delivery order.
    ///
    /// Non-text messages and status callbacks are skipped. A change without a
    /// `phone_number_id` falls back to the entry id.
    pub fn text_messages(&self) -> Vec<InboundChatMessage> {
        let mut out = Vec::new();
        for entry in &self.entry {
            for change in entry.changes.iter().filter(|c| c.field == "messages") {
                let value = &change.value;
                let channel_id = value
                    .metadata
                    .phone_number_id
                    .clone()
                    .unwrap_or_else(|| entry.id.clone());

                for message in &value.messages {
                    let body = match (&message.message_type[..], &message.text) {
                        ("text", Some(text)) if !text.body.trim().is_empty() => text.body.clone(),
                        _ => continue,
                    };
                    let sender_name = value
                        .contacts
                        .iter()
                        .find(|c| c.wa_id == message.from)
                        .and_then(|c| c.profile.as_ref())
                        .map(|p| p.name.clone());

                    out.push(InboundChatMessage {
                        channel_id: channel_id.clone(),
                        message_id: message.id.clone(),
                        from: message.from.clone(),
                        sender_name,
                        body,
                    });
                }
            }
        }
        out
    }

    /// Number of delivery-status callbacks carried, for logging.
    pub fn status_count(&self) -> usize {
        self.entry
            .iter()
            .flat_map(|e| &e.changes)
            .map(|c| c.value.statuses.len())
            .sum()
    }
}

/// Verifies `X-Hub-Signature-256: sha256=<hex>` over the raw body.
pub fn verify_hub_signature(
    app_secret: &SecretString,
    body: &[u8],
    header: Option<&str>,
) -> Result<(), WebhookError> {
    let header = header.ok_or(WebhookError::MissingSignature)?;
    let hex_sig = header
        .trim()
        .strip_prefix("sha256=")
        .ok_or(WebhookError::InvalidSignature)?;

    if verify_hex(app_secret.expose_secret().as_bytes(), body, hex_sig) {
        Ok(())
    } else {
        Err(WebhookError::InvalidSignature)
    }
}
