//! Notifier that records decisions in the log stream.

use async_trait::async_trait;
use tracing::info;

use crate::ports::{Notification, Notifier, Recipient};

/// Emits one structured log line per notification decision.
///
/// Message composition and delivery belong to the messaging service that
/// tails these records.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: Notification) {
        let (audience, handle) = match &notification.recipient {
            Recipient::Merchant(handle) => ("merchant", handle.as_str()),
            Recipient::Customer(handle) => ("customer", handle.as_str()),
        };
        info!(
            kind = %notification.kind,
            audience,
            recipient = handle,
            variables = ?notification.variables,
            "notification decided"
        );
    }
}
