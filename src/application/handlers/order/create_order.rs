//! CreateOrderHandler - gated order creation.
//!
//! Sequence: duplicate check on the originating message, gate reservation,
//! insert, commit. Any failure after the reservation releases the slot.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::application::handlers::subscription::SubscriptionGate;
use crate::domain::customer::Merchant;
use crate::domain::foundation::{
    Currency, CustomerId, DomainError, ErrorCode, MerchantId, OrderId,
};
use crate::domain::order::{Charges, LineItem, Order, OrderSource, PlaceOrder};
use crate::domain::subscription::{DenialReason, GateAction, GateDecision, Reservation};
use crate::ports::{
    CustomerRepository, MerchantDirectory, Notification, NotificationKind, Notifier,
    OrderInsert, OrderRepository, Recipient,
};

/// Order-number collisions tolerated before giving up.
const MAX_NUMBER_ATTEMPTS: usize = 3;

/// Command to create an order for an already resolved customer.
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub merchant_id: MerchantId,
    pub customer_id: CustomerId,
    pub items: Vec<LineItem>,
    /// Falls back to the merchant's default currency.
    pub currency: Option<Currency>,
    pub source: OrderSource,
    /// Idempotency key, unique per merchant.
    pub source_message_id: Option<String>,
    pub delivery_address: Option<String>,
    pub note: Option<String>,
    pub needs_clarification: bool,
}

#[derive(Debug, Clone)]
pub enum CreateOrderResult {
    Created {
        order: Order,
        /// This order used the last slot of the cycle.
        quota_exhausted: bool,
    },
    /// The originating message already produced an order.
    Duplicate { order_id: OrderId },
    Denied(DenialReason),
}

pub struct CreateOrderHandler {
    gate: Arc<SubscriptionGate>,
    merchants: Arc<dyn MerchantDirectory>,
    customers: Arc<dyn CustomerRepository>,
    orders: Arc<dyn OrderRepository>,
    notifier: Arc<dyn Notifier>,
    charges: Charges,
}

impl CreateOrderHandler {
    pub fn new(
        gate: Arc<SubscriptionGate>,
        merchants: Arc<dyn MerchantDirectory>,
        customers: Arc<dyn CustomerRepository>,
        orders: Arc<dyn OrderRepository>,
        notifier: Arc<dyn Notifier>,
        charges: Charges,
    ) -> Self {
        Self {
            gate,
            merchants,
            customers,
            orders,
            notifier,
            charges,
        }
    }

    pub async fn handle(&self, cmd: CreateOrderCommand) -> Result<CreateOrderResult, DomainError> {
        if let Some(message_id) = &cmd.source_message_id {
            if let Some(existing) = self
                .orders
                .find_by_source_message(&cmd.merchant_id, message_id)
                .await?
            {
                info!(order_id = %existing.id, message_id = %message_id, "message already ordered");
                return Ok(CreateOrderResult::Duplicate {
                    order_id: existing.id,
                });
            }
        }

        let merchant = self
            .merchants
            .find_by_id(&cmd.merchant_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::MerchantNotFound,
                    format!("merchant {} not found", cmd.merchant_id),
                )
            })?;

        let reservation = match self
            .gate
            .check_and_reserve(&cmd.merchant_id, GateAction::CreateOrder)
            .await?
        {
            GateDecision::Allowed(reservation) => reservation,
            GateDecision::Denied(reason) => {
                info!(merchant_id = %cmd.merchant_id, reason = %reason, "order creation denied");
                return Ok(CreateOrderResult::Denied(reason));
            }
        };

        let result = self.place_and_insert(&merchant, cmd).await;
        match result {
            Ok(Placed::Inserted(order)) => {
                let quota_exhausted = reservation.exhausts_quota();
                self.gate.commit(reservation);
                self.after_create(&merchant, &order, quota_exhausted).await;
                Ok(CreateOrderResult::Created {
                    order,
                    quota_exhausted,
                })
            }
            Ok(Placed::Duplicate(order_id)) => {
                self.release(reservation).await;
                Ok(CreateOrderResult::Duplicate { order_id })
            }
            Err(e) => {
                self.release(reservation).await;
                Err(e)
            }
        }
    }

    async fn place_and_insert(
        &self,
        merchant: &Merchant,
        cmd: CreateOrderCommand,
    ) -> Result<Placed, DomainError> {
        let mut order = Order::place(
            PlaceOrder {
                merchant_id: cmd.merchant_id,
                customer_id: cmd.customer_id,
                items: cmd.items,
                currency: cmd
                    .currency
                    .unwrap_or_else(|| merchant.default_currency.clone()),
                source: cmd.source,
                source_message_id: cmd.source_message_id,
                delivery_address: cmd.delivery_address,
                note: cmd.note,
                needs_clarification: cmd.needs_clarification,
            },
            self.charges,
        )?;

        for _ in 0..MAX_NUMBER_ATTEMPTS {
            match self.orders.insert(&order).await? {
                OrderInsert::Inserted => return Ok(Placed::Inserted(order)),
                OrderInsert::DuplicateMessage(existing) => return Ok(Placed::Duplicate(existing)),
                OrderInsert::DuplicateNumber => {
                    warn!(order_number = %order.order_number, "order number collision");
                    order.renumber();
                }
            }
        }
        Err(DomainError::new(
            ErrorCode::AlreadyExists,
            "could not allocate a unique order number",
        ))
    }

    async fn release(&self, reservation: Reservation) {
        let merchant_id = reservation.merchant_id;
        if let Err(e) = self.gate.release(reservation).await {
            error!(merchant_id = %merchant_id, error = %e, "failed to release order slot");
        }
    }

    async fn after_create(&self, merchant: &Merchant, order: &Order, quota_exhausted: bool) {
        if let Err(e) = self
            .customers
            .record_order(&order.customer_id, order.total, order.created_at)
            .await
        {
            error!(
                customer_id = %order.customer_id,
                order_id = %order.id,
                error = %e,
                "failed to update customer counters"
            );
        }

        info!(
            merchant_id = %order.merchant_id,
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total,
            "order created"
        );

        self.notify_merchant(merchant, NotificationKind::NewOrder, |n| {
            n.with("order_number", order.order_number.as_str())
                .with("total", order.total)
                .with("currency", &order.currency)
                .with("items", order.items.len())
        })
        .await;
        if quota_exhausted {
            self.notify_merchant(merchant, NotificationKind::OrderQuotaReached, |n| n)
                .await;
        }
    }

    async fn notify_merchant<F>(&self, merchant: &Merchant, kind: NotificationKind, build: F)
    where
        F: FnOnce(Notification) -> Notification,
    {
        let Some(contact) = &merchant.contact else {
            return;
        };
        let notification = Notification::new(Recipient::Merchant(contact.to_string()), kind);
        self.notifier.notify(build(notification)).await;
    }
}

enum Placed {
    Inserted(Order),
    Duplicate(OrderId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStores;
    use crate::adapters::notifications::RecordingNotifier;
    use crate::domain::customer::{ContactHandle, Customer};
    use crate::domain::foundation::{Money, Timestamp};
    use crate::domain::subscription::{BillingCycle, PlanTier, Subscription};
    use crate::ports::SubscriptionRepository;

    struct Fixture {
        stores: InMemoryStores,
        notifier: Arc<RecordingNotifier>,
        handler: CreateOrderHandler,
        merchant: Merchant,
        customer: Customer,
        subscription: Subscription,
    }

    async fn fixture(used: u32) -> Fixture {
        let stores = InMemoryStores::new();
        let notifier = Arc::new(RecordingNotifier::new());
        let merchant = Merchant {
            id: MerchantId::new(),
            display_name: "Chez Mado".to_string(),
            channel_id: "200300".to_string(),
            contact: Some(ContactHandle::new("237670000000").unwrap()),
            default_currency: Currency::new("XAF").unwrap(),
        };
        stores.merchants.add(merchant.clone()).await;

        let customer = Customer::first_contact(
            merchant.id,
            ContactHandle::new("237699000111").unwrap(),
            None,
        );
        stores.customers.insert(&customer).await.unwrap();

        let mut subscription =
            Subscription::start(merchant.id, PlanTier::Free, BillingCycle::Monthly, Timestamp::now());
        subscription.orders_used = used;
        stores.subscriptions.insert(&subscription).await.unwrap();

        let handler = CreateOrderHandler::new(
            Arc::new(SubscriptionGate::new(stores.subscriptions.clone())),
            stores.merchants.clone(),
            stores.customers.clone(),
            stores.orders.clone(),
            notifier.clone(),
            Charges {
                tax_bps: 1_925,
                shipping: Money::new(1_000).unwrap(),
            },
        );

        Fixture {
            stores,
            notifier,
            handler,
            merchant,
            customer,
            subscription,
        }
    }

    fn command(f: &Fixture, message_id: Option<&str>) -> CreateOrderCommand {
        CreateOrderCommand {
            merchant_id: f.merchant.id,
            customer_id: f.customer.id,
            items: vec![LineItem::new("robe africaine", 2, Money::new(15_000).unwrap()).unwrap()],
            currency: None,
            source: OrderSource::Chat,
            source_message_id: message_id.map(str::to_string),
            delivery_address: Some("Bonanjo".to_string()),
            note: None,
            needs_clarification: false,
        }
    }

    async fn used(f: &Fixture) -> u32 {
        f.stores
            .subscriptions
            .find_by_id(&f.subscription.id)
            .await
            .unwrap()
            .orders_used
    }

    // ══════════════════════════════════════════════════════════════
    // Creation
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn created_order_applies_charges_and_counts() {
        let f = fixture(0).await;
        let result = f.handler.handle(command(&f, Some("wamid.1"))).await.unwrap();

        let CreateOrderResult::Created { order, quota_exhausted } = result else {
            panic!("expected created, got {:?}", result);
        };
        assert!(!quota_exhausted);
        assert_eq!(order.subtotal.minor_units(), 30_000);
        assert_eq!(order.tax.minor_units(), 5_775);
        assert_eq!(order.total.minor_units(), 36_775);
        assert_eq!(order.currency.as_str(), "XAF");
        assert!(order.totals_consistent());

        assert_eq!(used(&f).await, 1);
        let customer = f.stores.customers.find_by_id(&f.customer.id).await.unwrap().unwrap();
        assert_eq!(customer.order_count, 1);
        assert_eq!(customer.lifetime_spend, order.total);
        assert_eq!(f.notifier.count_of(NotificationKind::NewOrder), 1);
    }

    #[tokio::test]
    async fn same_message_twice_is_duplicate_without_spending_quota() {
        let f = fixture(0).await;
        f.handler.handle(command(&f, Some("wamid.7"))).await.unwrap();
        let again = f.handler.handle(command(&f, Some("wamid.7"))).await.unwrap();

        assert!(matches!(again, CreateOrderResult::Duplicate { .. }));
        assert_eq!(f.stores.orders.count().await, 1);
        assert_eq!(used(&f).await, 1);
        assert_eq!(f.notifier.count_of(NotificationKind::NewOrder), 1);
    }

    // ══════════════════════════════════════════════════════════════
    // Gate
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn last_slot_notifies_quota_reached_then_denies() {
        let f = fixture(19).await;
        let last = f.handler.handle(command(&f, Some("wamid.a"))).await.unwrap();
        assert!(matches!(
            last,
            CreateOrderResult::Created { quota_exhausted: true, .. }
        ));
        assert_eq!(f.notifier.count_of(NotificationKind::OrderQuotaReached), 1);

        let denied = f.handler.handle(command(&f, Some("wamid.b"))).await.unwrap();
        assert!(matches!(
            denied,
            CreateOrderResult::Denied(DenialReason::QuotaExceeded { used: 20, limit: 20 })
        ));
        assert_eq!(f.stores.orders.count().await, 1);
        assert_eq!(f.notifier.count_of(NotificationKind::OrderQuotaReached), 1);
    }

    #[tokio::test]
    async fn invalid_order_releases_reservation() {
        let f = fixture(5).await;
        let mut cmd = command(&f, None);
        cmd.items.clear();

        let err = f.handler.handle(cmd).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(used(&f).await, 5);
    }
}
