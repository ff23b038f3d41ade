use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::Outage;
use crate::domain::foundation::{DomainError, ErrorCode, MerchantId, SubscriptionId};
use crate::domain::subscription::{Subscription, SubscriptionStatus};
use crate::ports::SubscriptionRepository;

/// In-memory subscription store.
///
/// The single write lock is the per-merchant serialization point for the
/// usage counter: check and increment happen under one guard.
#[derive(Debug, Default)]
pub struct InMemorySubscriptionRepository {
    rows: RwLock<HashMap<SubscriptionId, Subscription>>,
    outage: Outage,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outage(outage: Outage) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            outage,
        }
    }

    pub async fn find_by_id(&self, id: &SubscriptionId) -> Option<Subscription> {
        self.rows.read().await.get(id).cloned()
    }
}

fn not_found(id: &SubscriptionId) -> DomainError {
    DomainError::new(
        ErrorCode::SubscriptionNotFound,
        format!("subscription {} not found", id),
    )
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn find_active(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Option<Subscription>, DomainError> {
        self.outage.check()?;
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|s| s.merchant_id == *merchant_id && s.status == SubscriptionStatus::Active)
            .cloned())
    }

    async fn find_latest(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Option<Subscription>, DomainError> {
        self.outage.check()?;
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|s| s.merchant_id == *merchant_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn try_increment_usage(&self, id: &SubscriptionId) -> Result<Option<u32>, DomainError> {
        self.outage.check()?;
        let mut rows = self.rows.write().await;
        let row = rows.get_mut(id).ok_or_else(|| not_found(id))?;

        if row.status != SubscriptionStatus::Active {
            return Ok(None);
        }
        if let Some(quota) = row.orders_quota {
            if row.orders_used >= quota {
                return Ok(None);
            }
        }
        row.orders_used += 1;
        Ok(Some(row.orders_used))
    }

    async fn release_usage(&self, id: &SubscriptionId) -> Result<(), DomainError> {
        self.outage.check()?;
        let mut rows = self.rows.write().await;
        let row = rows.get_mut(id).ok_or_else(|| not_found(id))?;
        row.orders_used = row.orders_used.saturating_sub(1);
        Ok(())
    }

    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        self.outage.check()?;
        let mut rows = self.rows.write().await;
        let has_active = rows.values().any(|s| {
            s.merchant_id == subscription.merchant_id && s.status == SubscriptionStatus::Active
        });
        if has_active && subscription.status == SubscriptionStatus::Active {
            return Err(DomainError::new(
                ErrorCode::AlreadyExists,
                format!("merchant {} already has an active subscription", subscription.merchant_id),
            ));
        }
        rows.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        self.outage.check()?;
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(&subscription.id)
            .ok_or_else(|| not_found(&subscription.id))?;
        // The counter is owned by try_increment_usage/release_usage.
        let used = row.orders_used;
        *row = subscription.clone();
        row.orders_used = used;
        Ok(())
    }
}
