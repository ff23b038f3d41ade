//! GetOrderHandler - order with its payment attempts.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{DomainError, OrderId, Timestamp};
use crate::domain::order::Order;
use crate::domain::payment::Payment;
use crate::ports::{OrderRepository, PaymentRepository};

#[derive(Debug, Clone)]
pub struct GetOrderQuery {
    pub order_id: OrderId,
}

/// A payment attempt as read paths show it.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    #[serde(flatten)]
    pub payment: Payment,
    /// Pending past its expiry. The stored status stays `pending`.
    pub abandoned: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub payments: Vec<PaymentView>,
}

pub struct GetOrderHandler {
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentRepository>,
}

impl GetOrderHandler {
    pub fn new(orders: Arc<dyn OrderRepository>, payments: Arc<dyn PaymentRepository>) -> Self {
        Self { orders, payments }
    }

    pub async fn handle(&self, query: GetOrderQuery) -> Result<Option<OrderView>, DomainError> {
        let Some(order) = self.orders.find_by_id(&query.order_id).await? else {
            return Ok(None);
        };

        let now = Timestamp::now();
        let payments = self
            .payments
            .list_for_order(&order.id)
            .await?
            .into_iter()
            .map(|payment| PaymentView {
                abandoned: payment.is_abandoned_at(&now),
                payment,
            })
            .collect();

        Ok(Some(OrderView { order, payments }))
    }
}
