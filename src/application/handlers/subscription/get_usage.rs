//! GetUsageHandler - quota and usage view for a merchant.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{DomainError, MerchantId, SubscriptionId, Timestamp};
use crate::domain::subscription::{BillingCycle, Feature, PlanTier, SubscriptionStatus};
use crate::ports::SubscriptionRepository;

#[derive(Debug, Clone)]
pub struct GetUsageQuery {
    pub merchant_id: MerchantId,
}

/// Current cycle usage as shown to the merchant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageView {
    pub subscription_id: SubscriptionId,
    pub plan: PlanTier,
    pub status: SubscriptionStatus,
    pub billing_cycle: BillingCycle,
    pub orders_used: u32,
    pub orders_quota: Option<u32>,
    pub orders_remaining: Option<u32>,
    pub current_period_start: Timestamp,
    pub next_billing_date: Timestamp,
    pub features: Vec<Feature>,
    /// Denial code new orders would get right now, if any.
    pub blocked_reason: Option<String>,
}

pub struct GetUsageHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl GetUsageHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self { subscriptions }
    }

    /// Returns `None` when the merchant never subscribed.
    pub async fn handle(&self, query: GetUsageQuery) -> Result<Option<UsageView>, DomainError> {
        let row = match self.subscriptions.find_active(&query.merchant_id).await? {
            Some(row) => Some(row),
            None => self.subscriptions.find_latest(&query.merchant_id).await?,
        };

        Ok(row.map(|sub| {
            let blocked_reason = sub
                .standing_denial(&Timestamp::now())
                .map(|reason| reason.code().to_string())
                .or_else(|| sub.quota_reached().then(|| "quota_exceeded".to_string()));
            UsageView {
                subscription_id: sub.id,
                plan: sub.plan,
                status: sub.status,
                billing_cycle: sub.billing_cycle,
                orders_used: sub.orders_used,
                orders_quota: sub.orders_quota,
                orders_remaining: sub.remaining(),
                current_period_start: sub.current_period_start,
                next_billing_date: sub.next_billing_date,
                features: sub.features.clone(),
                blocked_reason,
            }
        }))
    }
}
