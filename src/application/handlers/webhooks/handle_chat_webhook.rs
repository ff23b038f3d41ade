//! HandleChatWebhookHandler - chat messages to orders.
//!
//! Record, verify, parse, then per text message: resolve the merchant,
//! interpret the text, resolve the customer, price the lines and create the
//! order through the gate. The message id is the idempotency key, so a
//! redelivered envelope produces no second order.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use secrecy::SecretString;
use tracing::{debug, info};

use super::{EventLogService, WebhookRejection};
use crate::application::handlers::customer::EntityResolver;
use crate::application::handlers::order::{
    CreateOrderCommand, CreateOrderHandler, CreateOrderResult,
};
use crate::domain::event_log::{EventOutcome, EventSource, SignatureCheck};
use crate::domain::foundation::{InboundEventId, Money, OrderId};
use crate::domain::messaging::{interpret, verify_hub_signature, ChatWebhook, InboundChatMessage};
use crate::domain::order::{LineItem, OrderSource};
use crate::domain::webhook::WebhookError;
use crate::ports::PriceResolver;

#[derive(Debug, Clone)]
pub struct HandleChatWebhookCommand {
    pub body: Vec<u8>,
    /// Allow-listed request headers, stored with the event.
    pub headers: BTreeMap<String, String>,
    /// `X-Hub-Signature-256` value, if sent.
    pub signature: Option<String>,
}

/// What happened to one text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    OrderCreated { order_id: OrderId },
    /// The message already produced this order.
    AlreadyOrdered { order_id: OrderId },
    /// Nothing order-like found; left for manual triage.
    NotAnOrder,
}

#[derive(Debug, Clone)]
pub struct HandleChatWebhookResult {
    pub event_id: InboundEventId,
    pub messages: Vec<(String, MessageOutcome)>,
}

pub struct HandleChatWebhookHandler {
    events: Arc<EventLogService>,
    resolver: Arc<EntityResolver>,
    prices: Arc<dyn PriceResolver>,
    create_order: Arc<CreateOrderHandler>,
    app_secret: Option<SecretString>,
}

impl HandleChatWebhookHandler {
    pub fn new(
        events: Arc<EventLogService>,
        resolver: Arc<EntityResolver>,
        prices: Arc<dyn PriceResolver>,
        create_order: Arc<CreateOrderHandler>,
        app_secret: Option<SecretString>,
    ) -> Self {
        Self {
            events,
            resolver,
            prices,
            create_order,
            app_secret,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleChatWebhookCommand,
    ) -> Result<HandleChatWebhookResult, WebhookRejection> {
        let event_id = self
            .events
            .record(EventSource::Chat, &cmd.body, cmd.headers)
            .await?;

        match self.process(&event_id, &cmd.body, cmd.signature.as_deref()).await {
            Ok(messages) => {
                let last_order = messages.iter().rev().find_map(|(_, outcome)| match outcome {
                    MessageOutcome::OrderCreated { order_id }
                    | MessageOutcome::AlreadyOrdered { order_id } => Some(order_id.to_string()),
                    MessageOutcome::NotAnOrder => None,
                });
                let detail = format!("{} text message(s)", messages.len());
                self.events
                    .succeed(&event_id, EventOutcome::processed(last_order, Some(detail)))
                    .await;
                Ok(HandleChatWebhookResult { event_id, messages })
            }
            Err(err) => Err(self.events.fail(&event_id, err).await),
        }
    }

    async fn process(
        &self,
        event_id: &InboundEventId,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<Vec<(String, MessageOutcome)>, WebhookError> {
        match &self.app_secret {
            Some(secret) => {
                let verified = verify_hub_signature(secret, body, signature);
                self.events
                    .mark_signature(event_id, SignatureCheck::from_result(&verified))
                    .await?;
                verified?;
            }
            None => {
                self.events
                    .mark_signature(event_id, SignatureCheck::NotConfigured)
                    .await?;
            }
        }

        let webhook = ChatWebhook::parse(body)?;
        let messages = webhook.text_messages();
        if messages.is_empty() {
            debug!(
                event_id = %event_id,
                statuses = webhook.status_count(),
                "no text messages in delivery"
            );
        }

        let mut outcomes = Vec::with_capacity(messages.len());
        for message in messages {
            let outcome = self.process_message(event_id, &message).await?;
            outcomes.push((message.message_id, outcome));
        }
        Ok(outcomes)
    }

    async fn process_message(
        &self,
        event_id: &InboundEventId,
        message: &InboundChatMessage,
    ) -> Result<MessageOutcome, WebhookError> {
        let merchant = self.resolver.resolve_merchant(&message.channel_id).await?;

        let Some(parsed) = interpret(&message.body) else {
            info!(
                event_id = %event_id,
                merchant_id = %merchant.id,
                message_id = %message.message_id,
                "message not understood, left for manual triage"
            );
            return Ok(MessageOutcome::NotAnOrder);
        };

        let name_hint = parsed
            .customer_name_hint
            .clone()
            .or_else(|| message.sender_name.clone());
        let customer = self
            .resolver
            .resolve_customer(&merchant.id, &message.from, name_hint)
            .await?;

        let mut prices = HashMap::new();
        for line in &parsed.lines {
            if !prices.contains_key(&line.name) {
                let price = self.prices.lookup_price(&merchant.id, &line.name).await?;
                prices.insert(line.name.clone(), price);
            }
        }
        let draft = parsed
            .price_with(|name| prices.get(name).copied().unwrap_or(Money::ZERO))
            .map_err(|e| WebhookError::InvalidField {
                field: "text.body",
                reason: e.to_string(),
            })?;

        let items = draft
            .items
            .into_iter()
            .map(|item| LineItem::new(item.name, item.quantity, item.unit_price))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| WebhookError::InvalidField {
                field: "text.body",
                reason: e.to_string(),
            })?;

        let result = self
            .create_order
            .handle(CreateOrderCommand {
                merchant_id: merchant.id,
                customer_id: customer.id,
                items,
                currency: None,
                source: OrderSource::Chat,
                source_message_id: Some(message.message_id.clone()),
                delivery_address: draft.delivery_hint,
                note: None,
                needs_clarification: draft.needs_clarification,
            })
            .await?;

        match result {
            CreateOrderResult::Created { order, .. } => Ok(MessageOutcome::OrderCreated {
                order_id: order.id,
            }),
            CreateOrderResult::Duplicate { order_id } => {
                Ok(MessageOutcome::AlreadyOrdered { order_id })
            }
            CreateOrderResult::Denied(reason) => Err(WebhookError::QuotaDenied(format!(
                "merchant {}: {}",
                merchant.id,
                reason.code()
            ))),
        }
    }
}
