//! OrderRepository port.
//!
//! Updates use optimistic concurrency: the caller passes the version it read
//! and the store refuses the write if the row moved on in between.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, MerchantId, OrderId};
use crate::domain::order::Order;

/// Result of inserting a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderInsert {
    Inserted,
    /// Another order already carries this originating message id.
    DuplicateMessage(OrderId),
    /// The generated order number is taken; renumber and retry.
    DuplicateNumber,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts a new order.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, order: &Order) -> Result<OrderInsert, DomainError>;

    /// Writes `order` if the stored version still equals `expected_version`.
    ///
    /// # Errors
    ///
    /// - `ConcurrentModification` when the stored version differs
    /// - `OrderNotFound` if the order doesn't exist
    async fn update(&self, order: &Order, expected_version: i64) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError>;

    /// Looks up the order created from a given chat message.
    async fn find_by_source_message(
        &self,
        merchant_id: &MerchantId,
        message_id: &str,
    ) -> Result<Option<Order>, DomainError>;
}
