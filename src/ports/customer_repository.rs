//! CustomerRepository port.
//!
//! Customers are unique on `(merchant_id, handle)`. Concurrent first
//! contact is resolved by the store's uniqueness constraint: the losing
//! insert reports [`SaveResult::AlreadyExists`] and the caller re-fetches.

use async_trait::async_trait;

use crate::domain::customer::{ContactHandle, Customer};
use crate::domain::foundation::{CustomerId, DomainError, MerchantId, Money, Timestamp};

/// Result of attempting to insert a row with a unique key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Record was inserted.
    Inserted,
    /// A record with the same unique key already exists.
    AlreadyExists,
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_handle(
        &self,
        merchant_id: &MerchantId,
        handle: &ContactHandle,
    ) -> Result<Option<Customer>, DomainError>;

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, DomainError>;

    /// Inserts a first-contact customer.
    ///
    /// Uses `ON CONFLICT DO NOTHING` semantics on `(merchant_id, handle)`.
    async fn insert(&self, customer: &Customer) -> Result<SaveResult, DomainError>;

    /// Applies one created order to the counters in a single atomic update.
    async fn record_order(
        &self,
        id: &CustomerId,
        amount: Money,
        at: Timestamp,
    ) -> Result<(), DomainError>;
}
