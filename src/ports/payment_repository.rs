//! PaymentRepository port.

use async_trait::async_trait;

use super::SaveResult;
use crate::domain::foundation::{DomainError, OrderId, PaymentId};
use crate::domain::payment::{Payment, PaymentStatus};

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Inserts a new attempt. Transaction ids are unique, internal and
    /// external alike; a backfill that loses a race reports `AlreadyExists`.
    async fn insert(&self, payment: &Payment) -> Result<SaveResult, DomainError>;

    /// Writes status, identifiers and snapshot if the stored status still
    /// equals `expected_status`.
    ///
    /// # Errors
    ///
    /// - `ConcurrentModification` when the stored status moved on
    /// - `PaymentNotFound` if the payment doesn't exist
    async fn update(
        &self,
        payment: &Payment,
        expected_status: PaymentStatus,
    ) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError>;

    /// Matches either the provider's transaction id or our own echoed back.
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError>;

    /// Newest attempt for an order.
    async fn find_latest_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<Payment>, DomainError>;

    /// All attempts for an order, oldest first.
    async fn list_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, DomainError>;
}
