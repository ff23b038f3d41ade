use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::Outage;
use crate::domain::foundation::{DomainError, ErrorCode, MerchantId, OrderId};
use crate::domain::order::Order;
use crate::ports::{OrderInsert, OrderRepository};

/// In-memory order store with version-checked updates.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<OrderId, Order>>,
    outage: Outage,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outage(outage: Outage) -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            outage,
        }
    }

    pub async fn count(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn all(&self) -> Vec<Order> {
        self.orders.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: &Order) -> Result<OrderInsert, DomainError> {
        self.outage.check()?;
        let mut orders = self.orders.write().await;

        if let Some(message_id) = &order.source_message_id {
            let duplicate = orders.values().find(|o| {
                o.merchant_id == order.merchant_id
                    && o.source_message_id.as_deref() == Some(message_id.as_str())
            });
            if let Some(existing) = duplicate {
                return Ok(OrderInsert::DuplicateMessage(existing.id));
            }
        }
        if orders.values().any(|o| o.order_number == order.order_number) {
            return Ok(OrderInsert::DuplicateNumber);
        }

        orders.insert(order.id, order.clone());
        Ok(OrderInsert::Inserted)
    }

    async fn update(&self, order: &Order, expected_version: i64) -> Result<(), DomainError> {
        self.outage.check()?;
        let mut orders = self.orders.write().await;
        let stored = orders.get_mut(&order.id).ok_or_else(|| {
            DomainError::new(ErrorCode::OrderNotFound, format!("order {} not found", order.id))
        })?;
        if stored.version != expected_version {
            return Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "order {} is at version {}, expected {}",
                    order.id, stored.version, expected_version
                ),
            ));
        }
        *stored = order.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        self.outage.check()?;
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn find_by_source_message(
        &self,
        merchant_id: &MerchantId,
        message_id: &str,
    ) -> Result<Option<Order>, DomainError> {
        self.outage.check()?;
        Ok(self
            .orders
            .read()
            .await
            .values()
            .find(|o| {
                o.merchant_id == *merchant_id && o.source_message_id.as_deref() == Some(message_id)
            })
            .cloned())
    }
}
