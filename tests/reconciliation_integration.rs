//! End-to-end reconciliation scenarios over the in-memory stores.
//!
//! Each test wires the real handlers the HTTP layer uses, then drives them
//! with chat and payment-provider bodies the way the senders would.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::json;
use tokio::sync::Barrier;

use orderwire::adapters::http::{AppSettings, AppState};
use orderwire::adapters::memory::{InMemoryPaymentRepository, InMemoryStores};
use orderwire::adapters::notifications::RecordingNotifier;
use orderwire::adapters::pricing::CatalogPriceResolver;
use orderwire::application::handlers::order::{
    GetOrderQuery, InitiatePaymentCommand, PaymentDefaults, UpdateOrderStatusCommand,
};
use orderwire::application::handlers::subscription::GetUsageQuery;
use orderwire::application::handlers::webhooks::{
    HandleChatWebhookCommand, HandlePaymentWebhookCommand, HandlePaymentWebhookResult,
    MessageOutcome, WebhookRejection,
};
use orderwire::domain::customer::{ContactHandle, Merchant};
use orderwire::domain::event_log::{EventSource, FailureKind, ProcessingStatus, SignatureCheck};
use orderwire::domain::foundation::{
    Currency, DomainError, ErrorCode, MerchantId, Money, OrderId, PaymentId, Timestamp,
};
use orderwire::domain::order::{Charges, OrderPaymentStatus, OrderStatus};
use orderwire::domain::payment::{
    Payment, PaymentStatus, ProviderNotification, ProviderSignatureVerifier,
};
use orderwire::domain::subscription::{BillingCycle, PlanTier, Subscription};
use orderwire::ports::{
    CustomerRepository, NotificationKind, OrderRepository, PaymentRepository, SaveResult,
    SubscriptionRepository,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

const CHANNEL_ID: &str = "104857600011";
const SENDER: &str = "237699000111";
const SITE_ID: &str = "5870001";
const SITE_SECRET: &str = "site_secret_12345";

struct Harness {
    stores: InMemoryStores,
    notifier: Arc<RecordingNotifier>,
    state: AppState,
    merchant_id: MerchantId,
}

impl Harness {
    async fn with_quota(quota: Option<u32>) -> Self {
        let stores = InMemoryStores::new();
        let notifier = Arc::new(RecordingNotifier::new());

        let merchant = Merchant {
            id: MerchantId::new(),
            display_name: "Boutique Awa".to_string(),
            channel_id: CHANNEL_ID.to_string(),
            contact: Some(ContactHandle::new("+237677000222").unwrap()),
            default_currency: Currency::new("XAF").unwrap(),
        };
        let merchant_id = merchant.id;
        stores.merchants.add(merchant).await;

        let mut subscription = Subscription::start(
            merchant_id,
            PlanTier::Starter,
            BillingCycle::Monthly,
            Timestamp::now(),
        );
        subscription.orders_quota = quota;
        stores.subscriptions.insert(&subscription).await.unwrap();

        let prices = Arc::new(CatalogPriceResolver::new(Money::new(5_000).unwrap()));
        prices
            .set_price(merchant_id, "robe africaine", Money::new(15_000).unwrap())
            .await;

        let settings = AppSettings {
            chat_verify_token: SecretString::new("verify-me".to_string()),
            chat_app_secret: None,
            payment_verifier: verifier(),
            payment_defaults: PaymentDefaults {
                provider: "cinetpay".to_string(),
                ttl_minutes: 30,
            },
            charges: Charges::NONE,
            request_timeout: Duration::from_secs(5),
        };

        let state = AppState {
            event_log: stores.event_log.clone(),
            merchants: stores.merchants.clone(),
            customers: stores.customers.clone(),
            orders: stores.orders.clone(),
            payments: stores.payments.clone(),
            subscriptions: stores.subscriptions.clone(),
            prices,
            notifier: notifier.clone(),
            settings: Arc::new(settings),
        };

        Self {
            stores,
            notifier,
            state,
            merchant_id,
        }
    }

    async fn new() -> Self {
        Self::with_quota(Some(200)).await
    }

    async fn send_chat(
        &self,
        message_id: &str,
        text: &str,
    ) -> Result<Vec<(String, MessageOutcome)>, FailureKind> {
        self.state
            .chat_webhook_handler()
            .handle(HandleChatWebhookCommand {
                body: chat_body(message_id, text),
                headers: BTreeMap::new(),
                signature: None,
            })
            .await
            .map(|result| result.messages)
            .map_err(|rejection| rejection.error.failure_kind().unwrap())
    }

    async fn chat_order(&self, message_id: &str, text: &str) -> OrderId {
        let messages = self.send_chat(message_id, text).await.unwrap();
        match &messages[0].1 {
            MessageOutcome::OrderCreated { order_id }
            | MessageOutcome::AlreadyOrdered { order_id } => *order_id,
            MessageOutcome::NotAnOrder => panic!("message was not read as an order"),
        }
    }

    async fn initiate(&self, order_id: OrderId) -> Payment {
        self.state
            .initiate_payment_handler()
            .handle(InitiatePaymentCommand {
                order_id,
                payment_method: None,
                payer_phone: None,
            })
            .await
            .unwrap()
    }

    async fn send_payment(
        &self,
        body: Vec<u8>,
    ) -> Result<HandlePaymentWebhookResult, WebhookRejection> {
        self.state
            .payment_webhook_handler()
            .handle(HandlePaymentWebhookCommand {
                body,
                headers: BTreeMap::new(),
            })
            .await
    }
}

fn verifier() -> ProviderSignatureVerifier {
    ProviderSignatureVerifier::new(SITE_ID, SecretString::new(SITE_SECRET.to_string()))
}

fn chat_body(message_id: &str, text: &str) -> Vec<u8> {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "WABA-1",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": { "phone_number_id": CHANNEL_ID },
                    "contacts": [{ "wa_id": SENDER, "profile": { "name": "Awa" } }],
                    "messages": [{
                        "id": message_id,
                        "from": SENDER,
                        "timestamp": "1760000000",
                        "type": "text",
                        "text": { "body": text }
                    }]
                }
            }]
        }]
    })
    .to_string()
    .into_bytes()
}

/// A provider notification signed the way the provider signs it.
fn provider_body(
    transaction_id: &str,
    amount: i64,
    result_code: &str,
    trans_status: &str,
    order_id: Option<OrderId>,
) -> Vec<u8> {
    let mut body = json!({
        "transactionId": transaction_id,
        "siteId": SITE_ID,
        "amount": amount,
        "currency": "XAF",
        "resultCode": result_code,
        "transStatus": trans_status,
        "paymentMethod": "OM",
        "phone": "+237699000111",
        "signature": "pending"
    });
    if let Some(order_id) = order_id {
        body["customData"] = json!(json!({ "orderId": order_id.to_string() }).to_string());
    }
    let notification = ProviderNotification::parse(body.to_string().as_bytes()).unwrap();
    body["signature"] = json!(verifier().sign(&notification));
    body.to_string().into_bytes()
}

// =============================================================================
// Chat Orders
// =============================================================================

#[tokio::test]
async fn chat_message_becomes_priced_order() {
    let h = Harness::new().await;

    let order_id = h.chat_order("wamid.1", "2x robe africaine\nadresse: Bonanjo").await;

    let order = h.stores.orders.find_by_id(&order_id).await.unwrap().unwrap();
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 2);
    assert_eq!(order.total, Money::new(30_000).unwrap());
    assert_eq!(order.delivery_address.as_deref(), Some("Bonanjo"));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, OrderPaymentStatus::Pending);
    assert_eq!(order.source_message_id.as_deref(), Some("wamid.1"));

    let usage = h
        .state
        .usage_handler()
        .handle(GetUsageQuery { merchant_id: h.merchant_id })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(usage.orders_used, 1);

    assert_eq!(h.notifier.count_of(NotificationKind::NewOrder), 1);

    let events = h.stores.event_log.all().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].source, EventSource::Chat);
    assert_eq!(events[0].status, ProcessingStatus::Processed);
    assert_eq!(events[0].signature_check, SignatureCheck::NotConfigured);
    assert_eq!(events[0].linked_entity_id, Some(order_id.to_string()));
}

#[tokio::test]
async fn redelivered_message_creates_one_order() {
    let h = Harness::new().await;

    let first = h.chat_order("wamid.dup", "3 sac en cuir").await;
    for _ in 0..4 {
        let again = h.send_chat("wamid.dup", "3 sac en cuir").await.unwrap();
        assert_eq!(again[0].1, MessageOutcome::AlreadyOrdered { order_id: first });
    }

    assert_eq!(h.stores.orders.count().await, 1);
    let usage = h
        .state
        .usage_handler()
        .handle(GetUsageQuery { merchant_id: h.merchant_id })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(usage.orders_used, 1);
    assert_eq!(h.notifier.count_of(NotificationKind::NewOrder), 1);

    // Every delivery is still logged.
    assert_eq!(h.stores.event_log.all().await.len(), 5);
}

#[tokio::test]
async fn same_sender_maps_to_one_customer() {
    let h = Harness::new().await;

    let first = h.chat_order("wamid.a", "1 robe africaine").await;
    let second = h.chat_order("wamid.b", "2 robe africaine").await;
    assert_ne!(first, second);

    assert_eq!(h.stores.customers.count().await, 1);
    let handle = ContactHandle::new(SENDER).unwrap();
    let customer = h
        .stores
        .customers
        .find_by_handle(&h.merchant_id, &handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(customer.order_count, 2);
    assert_eq!(customer.lifetime_spend, Money::new(45_000).unwrap());
    assert_eq!(customer.display_name.as_deref(), Some("Awa"));
}

#[tokio::test]
async fn chatter_is_left_for_triage() {
    let h = Harness::new().await;

    let messages = h.send_chat("wamid.hello", "bonjour, vous êtes ouverts ?").await.unwrap();

    assert_eq!(messages[0].1, MessageOutcome::NotAnOrder);
    assert_eq!(h.stores.orders.count().await, 0);
    let events = h.stores.event_log.all().await;
    assert_eq!(events[0].status, ProcessingStatus::Processed);
}

#[tokio::test]
async fn exhausted_quota_refuses_next_order() {
    let h = Harness::with_quota(Some(1)).await;

    h.chat_order("wamid.q1", "1 robe africaine").await;
    let refused = h.send_chat("wamid.q2", "1 robe africaine").await.unwrap_err();

    assert_eq!(refused, FailureKind::QuotaDenied);
    assert_eq!(h.stores.orders.count().await, 1);

    let subscription = h
        .stores
        .subscriptions
        .find_active(&h.merchant_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subscription.orders_used, 1);
    assert!(h.notifier.count_of(NotificationKind::OrderQuotaReached) >= 1);

    let failed: Vec<_> = h
        .stores
        .event_log
        .all()
        .await
        .into_iter()
        .filter(|e| e.status == ProcessingStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].failure_kind, Some(FailureKind::QuotaDenied));
}

#[tokio::test]
async fn unknown_channel_is_unresolvable() {
    let h = Harness::new().await;
    let body = String::from_utf8(chat_body("wamid.x", "1 robe africaine"))
        .unwrap()
        .replace(CHANNEL_ID, "999999");

    let rejection = h
        .state
        .chat_webhook_handler()
        .handle(HandleChatWebhookCommand {
            body: body.into_bytes(),
            headers: BTreeMap::new(),
            signature: None,
        })
        .await
        .unwrap_err();

    assert_eq!(
        rejection.error.failure_kind(),
        Some(FailureKind::UnresolvableReference)
    );
    assert!(!rejection.error.is_retryable());
    assert_eq!(h.stores.orders.count().await, 0);
}

// =============================================================================
// Payment Reconciliation
// =============================================================================

#[tokio::test]
async fn accepted_payment_marks_order_paid() {
    let h = Harness::new().await;
    let order_id = h.chat_order("wamid.pay", "2x robe africaine\nadresse: Bonanjo").await;
    let payment = h.initiate(order_id).await;

    let result = h
        .send_payment(provider_body(&payment.transaction_id, 30_000, "00", "ACCEPTED", Some(order_id)))
        .await
        .unwrap();

    assert_eq!(result.payment_status, PaymentStatus::Completed);
    assert!(result.payment_changed);
    assert!(result.order_changed);

    let order = h.stores.orders.find_by_id(&order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, OrderPaymentStatus::Paid);
    assert_eq!(order.status, OrderStatus::Paid);

    assert_eq!(h.notifier.count_of(NotificationKind::PaymentReceived), 1);
    assert_eq!(h.notifier.count_of(NotificationKind::PaymentConfirmation), 1);
}

#[tokio::test]
async fn payment_redelivery_converges() {
    let h = Harness::new().await;
    let order_id = h.chat_order("wamid.pay2", "1 robe africaine").await;
    let payment = h.initiate(order_id).await;
    let body = provider_body(&payment.transaction_id, 15_000, "00", "ACCEPTED", Some(order_id));

    h.send_payment(body.clone()).await.unwrap();
    let version = h.stores.orders.find_by_id(&order_id).await.unwrap().unwrap().version;

    for _ in 0..3 {
        let again = h.send_payment(body.clone()).await.unwrap();
        assert!(!again.payment_changed);
        assert!(!again.order_changed);
    }

    let order = h.stores.orders.find_by_id(&order_id).await.unwrap().unwrap();
    assert_eq!(order.version, version);
    assert_eq!(h.stores.payments.count().await, 1);
    assert_eq!(h.notifier.count_of(NotificationKind::PaymentReceived), 1);
}

#[tokio::test]
async fn pending_then_accepted_settles_once() {
    let h = Harness::new().await;
    let order_id = h.chat_order("wamid.pay3", "1 robe africaine").await;
    let payment = h.initiate(order_id).await;

    let waiting = h
        .send_payment(provider_body(&payment.transaction_id, 15_000, "623", "PENDING", None))
        .await
        .unwrap();
    assert_eq!(waiting.payment_status, PaymentStatus::Processing);
    assert!(!waiting.order_changed);

    let settled = h
        .send_payment(provider_body(&payment.transaction_id, 15_000, "00", "ACCEPTED", None))
        .await
        .unwrap();
    assert_eq!(settled.payment_status, PaymentStatus::Completed);
    assert!(settled.order_changed);
}

/// Payment store that holds the first two lookups until both have read, and
/// slows down writes of `processing`, so a stale report lands last.
struct InterleavedPayments {
    inner: Arc<InMemoryPaymentRepository>,
    lookups: AtomicUsize,
    both_read: Barrier,
}

#[async_trait]
impl PaymentRepository for InterleavedPayments {
    async fn insert(&self, payment: &Payment) -> Result<SaveResult, DomainError> {
        self.inner.insert(payment).await
    }

    async fn update(&self, payment: &Payment, expected: PaymentStatus) -> Result<(), DomainError> {
        if payment.status == PaymentStatus::Processing {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        self.inner.update(payment, expected).await
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Payment>, DomainError> {
        let found = self.inner.find_by_transaction_id(transaction_id).await;
        if self.lookups.fetch_add(1, Ordering::SeqCst) < 2 {
            self.both_read.wait().await;
        }
        found
    }

    async fn find_latest_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, DomainError> {
        self.inner.find_latest_for_order(order_id).await
    }

    async fn list_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, DomainError> {
        self.inner.list_for_order(order_id).await
    }
}

#[tokio::test]
async fn stale_pending_report_cannot_undo_concurrent_acceptance() {
    let mut h = Harness::new().await;
    let order_id = h.chat_order("wamid.race", "1 robe africaine").await;
    let payment = h.initiate(order_id).await;

    h.state.payments = Arc::new(InterleavedPayments {
        inner: h.stores.payments.clone(),
        lookups: AtomicUsize::new(0),
        both_read: Barrier::new(2),
    });

    let (pending, accepted) = tokio::join!(
        h.send_payment(provider_body(&payment.transaction_id, 15_000, "623", "PENDING", None)),
        h.send_payment(provider_body(&payment.transaction_id, 15_000, "00", "ACCEPTED", None)),
    );

    assert_eq!(accepted.unwrap().payment_status, PaymentStatus::Completed);
    let pending = pending.unwrap();
    assert_eq!(pending.payment_status, PaymentStatus::Completed);
    assert!(!pending.payment_changed);

    let stored = h.stores.payments.find_by_id(&payment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Completed);
    let order = h.stores.orders.find_by_id(&order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, OrderPaymentStatus::Paid);
}

#[tokio::test]
async fn amount_mismatch_fails_payment() {
    let h = Harness::new().await;
    let order_id = h.chat_order("wamid.short", "2x robe africaine").await;
    let payment = h.initiate(order_id).await;

    let result = h
        .send_payment(provider_body(&payment.transaction_id, 100, "00", "ACCEPTED", Some(order_id)))
        .await
        .unwrap();

    assert_eq!(result.payment_status, PaymentStatus::Failed);
    let view = h
        .state
        .get_order_handler()
        .handle(GetOrderQuery { order_id })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(view.order.payment_status, OrderPaymentStatus::Failed);
    assert_eq!(view.order.status, OrderStatus::Pending);
    let reason = view.payments[0].payment.failure_reason.clone().unwrap();
    assert!(reason.contains("amount mismatch"));
    assert_eq!(h.notifier.count_of(NotificationKind::PaymentReceived), 0);
}

#[tokio::test]
async fn unknown_transaction_is_backfilled_from_custom_data() {
    let h = Harness::new().await;
    let order_id = h.chat_order("wamid.backfill", "1 robe africaine").await;

    let result = h
        .send_payment(provider_body("CP-EXTERNAL-1", 15_000, "00", "ACCEPTED", Some(order_id)))
        .await
        .unwrap();

    assert_eq!(result.order_id, order_id);
    assert_eq!(result.payment_status, PaymentStatus::Completed);
    assert_eq!(h.stores.payments.count().await, 1);
}

#[tokio::test]
async fn unmatched_transaction_is_unresolvable() {
    let h = Harness::new().await;

    let rejection = h
        .send_payment(provider_body("CP-NOWHERE", 15_000, "00", "ACCEPTED", None))
        .await
        .unwrap_err();

    assert_eq!(
        rejection.error.failure_kind(),
        Some(FailureKind::UnresolvableReference)
    );
    assert_eq!(h.stores.payments.count().await, 0);
}

#[tokio::test]
async fn tampered_notification_is_rejected() {
    let h = Harness::new().await;
    let order_id = h.chat_order("wamid.tamper", "1 robe africaine").await;
    let payment = h.initiate(order_id).await;

    let body = String::from_utf8(provider_body(&payment.transaction_id, 15_000, "00", "ACCEPTED", None))
        .unwrap()
        .replace("15000", "15");
    let rejection = h.send_payment(body.into_bytes()).await.unwrap_err();

    assert_eq!(rejection.error.failure_kind(), Some(FailureKind::Authentication));
    let order = h.stores.orders.find_by_id(&order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, OrderPaymentStatus::Pending);

    let events = h.stores.event_log.all().await;
    let payment_event = events
        .iter()
        .find(|e| e.source == EventSource::PaymentProvider)
        .unwrap();
    assert_eq!(payment_event.signature_check, SignatureCheck::Rejected);
}

// =============================================================================
// Lifecycle and Availability
// =============================================================================

#[tokio::test]
async fn invalid_merchant_transition_leaves_order_untouched() {
    let h = Harness::new().await;
    let order_id = h.chat_order("wamid.skip", "1 robe africaine").await;
    let before = h.stores.orders.find_by_id(&order_id).await.unwrap().unwrap();

    let err = h
        .state
        .update_order_status_handler()
        .handle(UpdateOrderStatusCommand {
            order_id,
            status: OrderStatus::Delivered,
        })
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    let after = h.stores.orders.find_by_id(&order_id).await.unwrap().unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn store_outage_is_retriable() {
    let h = Harness::new().await;
    h.stores.outage.set(true);

    let rejection = h
        .state
        .chat_webhook_handler()
        .handle(HandleChatWebhookCommand {
            body: chat_body("wamid.down", "1 robe africaine"),
            headers: BTreeMap::new(),
            signature: None,
        })
        .await
        .unwrap_err();

    assert!(rejection.event_id.is_none());
    assert!(rejection.error.is_retryable());
    assert_eq!(rejection.error.status_code(), http::StatusCode::SERVICE_UNAVAILABLE);

    h.stores.outage.set(false);
    let retried = h.chat_order("wamid.down", "1 robe africaine").await;
    assert!(h.stores.orders.find_by_id(&retried).await.unwrap().is_some());
}

#[tokio::test]
async fn concurrent_messages_never_exceed_quota() {
    let h = Arc::new(Harness::with_quota(Some(3)).await);

    let sends = (0..8).map(|i| {
        let h = h.clone();
        async move { h.send_chat(&format!("wamid.burst.{}", i), "1 robe africaine").await }
    });
    let results = futures::future::join_all(sends).await;

    let created = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(FailureKind::QuotaDenied)))
        .count();
    assert_eq!(created, 3);
    assert_eq!(refused, 5);
    assert_eq!(h.stores.orders.count().await, 3);

    let subscription = h
        .stores
        .subscriptions
        .find_active(&h.merchant_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subscription.orders_used, 3);
}
