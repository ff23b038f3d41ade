//! Notifier port - outbound notification decisions.
//!
//! The engine only decides *that* someone should be told something. Body
//! composition and delivery belong to the implementation, which also owns
//! logging of its own failures. Calls are fire-and-forget.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Template kinds the engine can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// To the merchant: a chat message became an order.
    NewOrder,
    /// To the merchant: the last order of the cycle was taken, or one was refused.
    OrderQuotaReached,
    /// To the merchant: a payment settled.
    PaymentReceived,
    /// To the customer: their payment settled.
    PaymentConfirmation,
    /// To the customer: their payment failed.
    PaymentFailed,
    /// To the customer: the order moved to a new status.
    OrderStatusChanged,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewOrder => "new_order",
            NotificationKind::OrderQuotaReached => "order_quota_reached",
            NotificationKind::PaymentReceived => "payment_received",
            NotificationKind::PaymentConfirmation => "payment_confirmation",
            NotificationKind::PaymentFailed => "payment_failed",
            NotificationKind::OrderStatusChanged => "order_status_changed",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "handle", rename_all = "snake_case")]
pub enum Recipient {
    Merchant(String),
    Customer(String),
}

/// One notification decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: Recipient,
    pub kind: NotificationKind,
    pub variables: BTreeMap<String, String>,
}

impl Notification {
    pub fn new(recipient: Recipient, kind: NotificationKind) -> Self {
        Self {
            recipient,
            kind,
            variables: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.variables.insert(key.into(), value.to_string());
        self
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Hands off a notification. Never fails from the caller's perspective.
    async fn notify(&self, notification: Notification);
}
