//! SubscriptionRepository port.
//!
//! The usage counter is the one shared resource that needs per-merchant
//! mutual exclusion. Implementations must make
//! [`try_increment_usage`](SubscriptionRepository::try_increment_usage) a
//! single conditional operation: check `used < quota` and increment together.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, MerchantId, SubscriptionId};
use crate::domain::subscription::Subscription;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// The merchant's active row, if any.
    async fn find_active(&self, merchant_id: &MerchantId)
        -> Result<Option<Subscription>, DomainError>;

    /// The merchant's newest row whatever its status.
    async fn find_latest(&self, merchant_id: &MerchantId)
        -> Result<Option<Subscription>, DomainError>;

    /// Atomically takes one slot if the row is active and below quota.
    ///
    /// Returns the new counter value, or `None` when the ceiling was hit or
    /// the row is no longer active. Unlimited rows always succeed.
    async fn try_increment_usage(&self, id: &SubscriptionId) -> Result<Option<u32>, DomainError>;

    /// Gives a reserved slot back. Never takes the counter below zero.
    async fn release_usage(&self, id: &SubscriptionId) -> Result<(), DomainError>;

    /// Inserts a new row.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if the merchant already has an active row
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Updates status and dates of an existing row.
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;
}
