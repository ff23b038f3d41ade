//! Response bodies for webhook endpoints.
//!
//! Senders only look at the status code; the bodies exist for operators
//! replaying deliveries by hand.

use serde::Serialize;

use crate::application::handlers::webhooks::{
    HandleChatWebhookResult, HandlePaymentWebhookResult, MessageOutcome,
};
use crate::domain::event_log::FailureKind;
use crate::domain::payment::PaymentStatus;

#[derive(Debug, Clone, Serialize)]
pub struct ChatWebhookResponse {
    pub status: &'static str,
    pub event_id: String,
    pub messages: Vec<MessageOutcomeResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageOutcomeResponse {
    pub message_id: String,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

impl From<HandleChatWebhookResult> for ChatWebhookResponse {
    fn from(result: HandleChatWebhookResult) -> Self {
        let messages = result
            .messages
            .into_iter()
            .map(|(message_id, outcome)| {
                let (outcome, order_id) = match outcome {
                    MessageOutcome::OrderCreated { order_id } => {
                        ("order_created", Some(order_id.to_string()))
                    }
                    MessageOutcome::AlreadyOrdered { order_id } => {
                        ("already_ordered", Some(order_id.to_string()))
                    }
                    MessageOutcome::NotAnOrder => ("not_an_order", None),
                };
                MessageOutcomeResponse {
                    message_id,
                    outcome,
                    order_id,
                }
            })
            .collect();

        Self {
            status: "processed",
            event_id: result.event_id.to_string(),
            messages,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentWebhookResponse {
    pub status: &'static str,
    pub event_id: String,
    pub payment_id: String,
    pub order_id: String,
    pub payment_status: PaymentStatus,
    pub payment_changed: bool,
    pub order_changed: bool,
}

impl From<HandlePaymentWebhookResult> for PaymentWebhookResponse {
    fn from(result: HandlePaymentWebhookResult) -> Self {
        Self {
            status: "processed",
            event_id: result.event_id.to_string(),
            payment_id: result.payment_id.to_string(),
            order_id: result.order_id.to_string(),
            payment_status: result.payment_status,
            payment_changed: result.payment_changed,
            order_changed: result.order_changed,
        }
    }
}

/// Body of a delivery that was acknowledged without being processed.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    /// `failed` or `ignored`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    pub detail: String,
}
