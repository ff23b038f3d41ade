//! InitiatePaymentHandler - opens a payment attempt for an order.

use std::sync::Arc;

use tracing::info;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId};
use crate::domain::order::OrderPaymentStatus;
use crate::domain::payment::{NewPayment, Payment};
use crate::ports::{OrderRepository, PaymentRepository, SaveResult};

#[derive(Debug, Clone)]
pub struct InitiatePaymentCommand {
    pub order_id: OrderId,
    pub payment_method: Option<String>,
    pub payer_phone: Option<String>,
}

/// Provider settings applied to every new attempt.
#[derive(Debug, Clone)]
pub struct PaymentDefaults {
    pub provider: String,
    pub ttl_minutes: i64,
}

pub struct InitiatePaymentHandler {
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentRepository>,
    defaults: PaymentDefaults,
}

impl InitiatePaymentHandler {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentRepository>,
        defaults: PaymentDefaults,
    ) -> Self {
        Self {
            orders,
            payments,
            defaults,
        }
    }

    /// Creates a pending attempt for the order's full total. A previous
    /// attempt, if any, is recorded as superseded.
    pub async fn handle(&self, cmd: InitiatePaymentCommand) -> Result<Payment, DomainError> {
        let order = self.orders.find_by_id(&cmd.order_id).await?.ok_or_else(|| {
            DomainError::new(
                ErrorCode::OrderNotFound,
                format!("order {} not found", cmd.order_id),
            )
        })?;

        let payable = order.status.accepts_payment()
            && matches!(
                order.payment_status,
                OrderPaymentStatus::Pending | OrderPaymentStatus::Failed
            );
        if !payable {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "order {} does not accept payment (status {}, payment {})",
                    order.id, order.status, order.payment_status
                ),
            )
            .with_detail("from", order.payment_status.to_string())
            .with_detail("to", OrderPaymentStatus::Paid.to_string()));
        }

        let previous = self.payments.find_latest_for_order(&order.id).await?;
        let payment = Payment::initiate(NewPayment {
            order_id: order.id,
            merchant_id: order.merchant_id,
            amount: order.total,
            currency: order.currency.clone(),
            provider: self.defaults.provider.clone(),
            payment_method: cmd.payment_method,
            payer_phone: cmd.payer_phone,
            ttl_minutes: self.defaults.ttl_minutes,
            supersedes: previous.map(|p| p.id),
        });

        match self.payments.insert(&payment).await? {
            SaveResult::Inserted => {}
            SaveResult::AlreadyExists => {
                return Err(DomainError::new(
                    ErrorCode::AlreadyExists,
                    format!("transaction id {} already used", payment.transaction_id),
                ))
            }
        }

        info!(
            order_id = %order.id,
            payment_id = %payment.id,
            transaction_id = %payment.transaction_id,
            amount = %payment.amount,
            "payment initiated"
        );
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStores;
    use crate::domain::foundation::{Currency, CustomerId, MerchantId, Money};
    use crate::domain::order::{Charges, LineItem, Order, OrderSource, OrderStatus, PlaceOrder};
    use crate::domain::payment::PaymentStatus;

    fn defaults() -> PaymentDefaults {
        PaymentDefaults {
            provider: "cinetpay".to_string(),
            ttl_minutes: 30,
        }
    }

    async fn stored_order(stores: &InMemoryStores) -> Order {
        let order = Order::place(
            PlaceOrder {
                merchant_id: MerchantId::new(),
                customer_id: CustomerId::new(),
                items: vec![LineItem::new("robe", 2, Money::new(10_000).unwrap()).unwrap()],
                currency: Currency::new("XOF").unwrap(),
                source: OrderSource::Api,
                source_message_id: None,
                delivery_address: None,
                note: None,
                needs_clarification: false,
            },
            Charges {
                tax_bps: 0,
                shipping: Money::new(1_000).unwrap(),
            },
        )
        .unwrap();
        stores.orders.insert(&order).await.unwrap();
        order
    }

    #[tokio::test]
    async fn attempt_covers_order_total() {
        let stores = InMemoryStores::new();
        let order = stored_order(&stores).await;
        let handler =
            InitiatePaymentHandler::new(stores.orders.clone(), stores.payments.clone(), defaults());

        let payment = handler
            .handle(InitiatePaymentCommand {
                order_id: order.id,
                payment_method: Some("MOBILE_MONEY".to_string()),
                payer_phone: None,
            })
            .await
            .unwrap();

        assert_eq!(payment.amount.minor_units(), 21_000);
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(payment.transaction_id.starts_with("PAY-"));
        assert!(payment.supersedes.is_none());
    }

    #[tokio::test]
    async fn second_attempt_supersedes_first() {
        let stores = InMemoryStores::new();
        let order = stored_order(&stores).await;
        let handler =
            InitiatePaymentHandler::new(stores.orders.clone(), stores.payments.clone(), defaults());
        let cmd = InitiatePaymentCommand {
            order_id: order.id,
            payment_method: None,
            payer_phone: None,
        };

        let first = handler.handle(cmd.clone()).await.unwrap();
        let second = handler.handle(cmd).await.unwrap();
        assert_eq!(second.supersedes, Some(first.id));
    }

    #[tokio::test]
    async fn cancelled_order_refuses_payment() {
        let stores = InMemoryStores::new();
        let mut order = stored_order(&stores).await;
        order.status = OrderStatus::Cancelled;
        stores.orders.update(&order, order.version).await.unwrap();

        let err = InitiatePaymentHandler::new(stores.orders.clone(), stores.payments.clone(), defaults())
            .handle(InitiatePaymentCommand {
                order_id: order.id,
                payment_method: None,
                payer_phone: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }
}
