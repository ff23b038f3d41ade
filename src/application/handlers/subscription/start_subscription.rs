//! StartSubscriptionHandler - opens a new billing-cycle row.

use std::sync::Arc;

use tracing::info;

use crate::domain::foundation::{DomainError, MerchantId, Timestamp};
use crate::domain::subscription::{BillingCycle, PlanTier, Subscription, SubscriptionStatus};
use crate::ports::SubscriptionRepository;

/// Command to start a billing cycle on a plan.
#[derive(Debug, Clone)]
pub struct StartSubscriptionCommand {
    pub merchant_id: MerchantId,
    pub plan: PlanTier,
    pub billing_cycle: BillingCycle,
}

#[derive(Debug, Clone)]
pub struct StartSubscriptionResult {
    pub subscription: Subscription,
    /// Row that was expired to make room, if any.
    pub replaced: Option<Subscription>,
}

/// Expires the current active row and inserts a fresh one with
/// `orders_used = 0`. Counters are never reset in place.
pub struct StartSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl StartSubscriptionHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self { subscriptions }
    }

    pub async fn handle(
        &self,
        cmd: StartSubscriptionCommand,
    ) -> Result<StartSubscriptionResult, DomainError> {
        let replaced = match self.subscriptions.find_active(&cmd.merchant_id).await? {
            Some(mut current) => {
                current.transition(SubscriptionStatus::Expired).map_err(|e| {
                    DomainError::from(e).with_detail("subscription_id", current.id.to_string())
                })?;
                self.subscriptions.update(&current).await?;
                Some(current)
            }
            None => None,
        };

        let subscription =
            Subscription::start(cmd.merchant_id, cmd.plan, cmd.billing_cycle, Timestamp::now());
        self.subscriptions.insert(&subscription).await?;

        info!(
            merchant_id = %cmd.merchant_id,
            subscription_id = %subscription.id,
            plan = %cmd.plan.as_str(),
            "subscription started"
        );

        Ok(StartSubscriptionResult {
            subscription,
            replaced,
        })
    }
}
