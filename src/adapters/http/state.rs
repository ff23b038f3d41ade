//! Shared router state.
//!
//! Holds the ports and settings; handlers are assembled per request from
//! these `Arc`s, which keeps the state cheap to clone.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::application::handlers::customer::EntityResolver;
use crate::application::handlers::order::{
    CreateOrderHandler, GetOrderHandler, InitiatePaymentHandler, OrderLifecycleManager,
    PaymentDefaults, UpdateOrderStatusHandler,
};
use crate::application::handlers::subscription::{
    GetUsageHandler, StartSubscriptionHandler, SubscriptionGate,
};
use crate::application::handlers::webhooks::{
    EventLogService, HandleChatWebhookHandler, HandlePaymentWebhookHandler, PaymentReconcilerDeps,
};
use crate::config::{AppConfig, ValidationError};
use crate::domain::order::Charges;
use crate::domain::payment::ProviderSignatureVerifier;
use crate::ports::{
    CustomerRepository, EventLogRepository, MerchantDirectory, Notifier, OrderRepository,
    PaymentRepository, PriceResolver, SubscriptionRepository,
};

/// Settings derived once from configuration.
#[derive(Clone)]
pub struct AppSettings {
    pub chat_verify_token: SecretString,
    /// `None` skips the `X-Hub-Signature-256` check.
    pub chat_app_secret: Option<SecretString>,
    pub payment_verifier: ProviderSignatureVerifier,
    pub payment_defaults: PaymentDefaults,
    pub charges: Charges,
    pub request_timeout: Duration,
}

impl AppSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, ValidationError> {
        Ok(Self {
            chat_verify_token: config.chat.verify_token.clone(),
            chat_app_secret: config.chat.signing_secret(),
            payment_verifier: ProviderSignatureVerifier::new(
                config.payment.site_id.clone(),
                config.payment.shared_secret.clone(),
            ),
            payment_defaults: PaymentDefaults {
                provider: config.payment.provider.clone(),
                ttl_minutes: config.payment.payment_ttl_minutes,
            },
            charges: config.orders.charges()?,
            request_timeout: config.server.request_timeout(),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub event_log: Arc<dyn EventLogRepository>,
    pub merchants: Arc<dyn MerchantDirectory>,
    pub customers: Arc<dyn CustomerRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub prices: Arc<dyn PriceResolver>,
    pub notifier: Arc<dyn Notifier>,
    pub settings: Arc<AppSettings>,
}

impl AppState {
    pub fn event_log_service(&self) -> Arc<EventLogService> {
        Arc::new(EventLogService::new(self.event_log.clone()))
    }

    pub fn entity_resolver(&self) -> Arc<EntityResolver> {
        Arc::new(EntityResolver::new(
            self.merchants.clone(),
            self.customers.clone(),
        ))
    }

    pub fn lifecycle(&self) -> Arc<OrderLifecycleManager> {
        Arc::new(OrderLifecycleManager::new(self.orders.clone()))
    }

    pub fn subscription_gate(&self) -> Arc<SubscriptionGate> {
        Arc::new(SubscriptionGate::new(self.subscriptions.clone()))
    }

    pub fn create_order_handler(&self) -> CreateOrderHandler {
        CreateOrderHandler::new(
            self.subscription_gate(),
            self.merchants.clone(),
            self.customers.clone(),
            self.orders.clone(),
            self.notifier.clone(),
            self.settings.charges,
        )
    }

    pub fn chat_webhook_handler(&self) -> HandleChatWebhookHandler {
        HandleChatWebhookHandler::new(
            self.event_log_service(),
            self.entity_resolver(),
            self.prices.clone(),
            Arc::new(self.create_order_handler()),
            self.settings.chat_app_secret.clone(),
        )
    }

    pub fn payment_webhook_handler(&self) -> HandlePaymentWebhookHandler {
        HandlePaymentWebhookHandler::new(
            PaymentReconcilerDeps {
                events: self.event_log_service(),
                payments: self.payments.clone(),
                orders: self.orders.clone(),
                lifecycle: self.lifecycle(),
                merchants: self.merchants.clone(),
                customers: self.customers.clone(),
                notifier: self.notifier.clone(),
            },
            self.settings.payment_verifier.clone(),
            self.settings.payment_defaults.provider.clone(),
            self.settings.payment_defaults.ttl_minutes,
        )
    }

    pub fn update_order_status_handler(&self) -> UpdateOrderStatusHandler {
        UpdateOrderStatusHandler::new(
            self.lifecycle(),
            self.customers.clone(),
            self.notifier.clone(),
        )
    }

    pub fn initiate_payment_handler(&self) -> InitiatePaymentHandler {
        InitiatePaymentHandler::new(
            self.orders.clone(),
            self.payments.clone(),
            self.settings.payment_defaults.clone(),
        )
    }

    pub fn get_order_handler(&self) -> GetOrderHandler {
        GetOrderHandler::new(self.orders.clone(), self.payments.clone())
    }

    pub fn start_subscription_handler(&self) -> StartSubscriptionHandler {
        StartSubscriptionHandler::new(self.subscriptions.clone())
    }

    pub fn usage_handler(&self) -> GetUsageHandler {
        GetUsageHandler::new(self.subscriptions.clone())
    }
}
