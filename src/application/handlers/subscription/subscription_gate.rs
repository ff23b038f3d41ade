//! SubscriptionGate - quota and plan checks in front of order creation.
//!
//! The gate reserves a slot with the store's atomic conditional increment.
//! A reservation is committed once the guarded action is durable, or released
//! so a failed attempt costs the merchant nothing.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::foundation::{DomainError, MerchantId, Timestamp};
use crate::domain::subscription::{
    DenialReason, Feature, GateAction, GateDecision, Reservation, Subscription,
};
use crate::ports::SubscriptionRepository;

/// Decides whether a merchant may perform an action.
pub struct SubscriptionGate {
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl SubscriptionGate {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self { subscriptions }
    }

    /// Checks the merchant's subscription and, for order creation, takes one
    /// slot from the cycle quota in the same store operation.
    pub async fn check_and_reserve(
        &self,
        merchant_id: &MerchantId,
        action: GateAction,
    ) -> Result<GateDecision, DomainError> {
        let subscription = match self.usable_subscription(merchant_id).await? {
            Ok(subscription) => subscription,
            Err(reason) => {
                info!(merchant_id = %merchant_id, reason = %reason, "gate denied");
                return Ok(GateDecision::Denied(reason));
            }
        };

        match action {
            GateAction::UseFeature { feature } => Ok(self.check_feature(&subscription, feature)),
            GateAction::CreateOrder => self.reserve_order_slot(subscription).await,
        }
    }

    /// Checks a plan feature without touching the counter.
    pub async fn use_feature(
        &self,
        merchant_id: &MerchantId,
        feature: Feature,
    ) -> Result<GateDecision, DomainError> {
        self.check_and_reserve(merchant_id, GateAction::UseFeature { feature })
            .await
    }

    /// Marks a reservation as spent. The counter already holds the slot.
    pub fn commit(&self, reservation: Reservation) {
        debug!(
            merchant_id = %reservation.merchant_id,
            subscription_id = %reservation.subscription_id,
            used = ?reservation.used_after,
            "reservation committed"
        );
    }

    /// Returns a reserved slot to the quota.
    pub async fn release(&self, reservation: Reservation) -> Result<(), DomainError> {
        if !reservation.counted {
            return Ok(());
        }
        self.subscriptions
            .release_usage(&reservation.subscription_id)
            .await?;
        debug!(
            merchant_id = %reservation.merchant_id,
            subscription_id = %reservation.subscription_id,
            "reservation released"
        );
        Ok(())
    }

    /// The active row, or the reason there is none.
    async fn usable_subscription(
        &self,
        merchant_id: &MerchantId,
    ) -> Result<Result<Subscription, DenialReason>, DomainError> {
        let now = Timestamp::now();
        if let Some(active) = self.subscriptions.find_active(merchant_id).await? {
            return Ok(match active.standing_denial(&now) {
                Some(reason) => Err(reason),
                None => Ok(active),
            });
        }

        let latest = self.subscriptions.find_latest(merchant_id).await?;
        Ok(Err(latest
            .and_then(|row| row.standing_denial(&now))
            .unwrap_or(DenialReason::NoSubscription)))
    }

    fn check_feature(&self, subscription: &Subscription, feature: Feature) -> GateDecision {
        if !subscription.has_feature(feature) {
            return GateDecision::Denied(DenialReason::FeatureNotIncluded {
                feature,
                required_tier: feature.minimum_tier(),
            });
        }
        GateDecision::Allowed(Reservation {
            subscription_id: subscription.id,
            merchant_id: subscription.merchant_id,
            used_after: None,
            limit: subscription.orders_quota,
            counted: false,
        })
    }

    async fn reserve_order_slot(
        &self,
        subscription: Subscription,
    ) -> Result<GateDecision, DomainError> {
        if let Some(used) = self
            .subscriptions
            .try_increment_usage(&subscription.id)
            .await?
        {
            return Ok(GateDecision::Allowed(Reservation {
                subscription_id: subscription.id,
                merchant_id: subscription.merchant_id,
                used_after: Some(used),
                limit: subscription.orders_quota,
                counted: true,
            }));
        }

        // The increment refused: either the ceiling is hit or the row left
        // the active state between our read and the update.
        let current = self.subscriptions.find_active(&subscription.merchant_id).await?;
        let reason = match current.and_then(|row| {
            let limit = row.orders_quota.filter(|_| row.id == subscription.id)?;
            Some((row.orders_used, limit))
        }) {
            Some((used, limit)) => DenialReason::QuotaExceeded { used, limit },
            None => self
                .usable_subscription(&subscription.merchant_id)
                .await?
                .err()
                .unwrap_or(DenialReason::SubscriptionExpired),
        };
        warn!(merchant_id = %subscription.merchant_id, reason = %reason, "order slot refused");
        Ok(GateDecision::Denied(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::domain::foundation::ErrorCode;
    use crate::domain::subscription::{BillingCycle, PlanTier, SubscriptionStatus};

    fn setup() -> (Arc<InMemorySubscriptionRepository>, SubscriptionGate) {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let gate = SubscriptionGate::new(repo.clone());
        (repo, gate)
    }

    async fn subscribe(
        repo: &InMemorySubscriptionRepository,
        merchant: MerchantId,
        plan: PlanTier,
    ) -> Subscription {
        let sub = Subscription::start(merchant, plan, BillingCycle::Monthly, Timestamp::now());
        repo.insert(&sub).await.unwrap();
        sub
    }

    // ══════════════════════════════════════════════════════════════
    // Standing checks
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn no_subscription_is_denied() {
        let (_, gate) = setup();
        let decision = gate
            .check_and_reserve(&MerchantId::new(), GateAction::CreateOrder)
            .await
            .unwrap();
        assert_eq!(decision, GateDecision::Denied(DenialReason::NoSubscription));
    }

    #[tokio::test]
    async fn cancelled_subscription_reports_cancelled() {
        let (repo, gate) = setup();
        let merchant = MerchantId::new();
        let mut sub = subscribe(&repo, merchant, PlanTier::Free).await;
        sub.transition(SubscriptionStatus::Cancelled).unwrap();
        repo.update(&sub).await.unwrap();

        let decision = gate
            .check_and_reserve(&merchant, GateAction::CreateOrder)
            .await
            .unwrap();
        assert_eq!(
            decision,
            GateDecision::Denied(DenialReason::SubscriptionCancelled)
        );
    }

    #[tokio::test]
    async fn active_row_past_billing_date_is_expired() {
        let (repo, gate) = setup();
        let merchant = MerchantId::new();
        let sub = Subscription::start(
            merchant,
            PlanTier::Free,
            BillingCycle::Monthly,
            Timestamp::now().add_days(-40),
        );
        repo.insert(&sub).await.unwrap();

        let decision = gate
            .check_and_reserve(&merchant, GateAction::CreateOrder)
            .await
            .unwrap();
        assert_eq!(decision, GateDecision::Denied(DenialReason::SubscriptionExpired));
        assert_eq!(repo.find_by_id(&sub.id).await.unwrap().orders_used, 0);
    }

    // ══════════════════════════════════════════════════════════════
    // Reservation
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn reservation_takes_a_slot_and_release_returns_it() {
        let (repo, gate) = setup();
        let merchant = MerchantId::new();
        let sub = subscribe(&repo, merchant, PlanTier::Free).await;

        let reservation = gate
            .check_and_reserve(&merchant, GateAction::CreateOrder)
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(reservation.used_after, Some(1));
        assert_eq!(reservation.limit, Some(20));

        gate.release(reservation).await.unwrap();
        assert_eq!(repo.find_by_id(&sub.id).await.unwrap().orders_used, 0);
    }

    #[tokio::test]
    async fn last_slot_exhausts_and_next_is_quota_exceeded() {
        let (repo, gate) = setup();
        let merchant = MerchantId::new();
        let mut sub = Subscription::start(merchant, PlanTier::Free, BillingCycle::Monthly, Timestamp::now());
        sub.orders_used = 19;
        repo.insert(&sub).await.unwrap();

        let last = gate
            .check_and_reserve(&merchant, GateAction::CreateOrder)
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert!(last.exhausts_quota());
        gate.commit(last);

        let decision = gate
            .check_and_reserve(&merchant, GateAction::CreateOrder)
            .await
            .unwrap();
        assert_eq!(
            decision,
            GateDecision::Denied(DenialReason::QuotaExceeded { used: 20, limit: 20 })
        );
    }

    #[tokio::test]
    async fn concurrent_reservations_at_last_slot_allow_exactly_one() {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let gate = Arc::new(SubscriptionGate::new(repo.clone()));
        let merchant = MerchantId::new();
        let mut sub = Subscription::start(merchant, PlanTier::Starter, BillingCycle::Monthly, Timestamp::now());
        sub.orders_used = 199;
        repo.insert(&sub).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move {
                    gate.check_and_reserve(&merchant, GateAction::CreateOrder)
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut allowed = 0;
        let mut exceeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                GateDecision::Allowed(_) => allowed += 1,
                GateDecision::Denied(DenialReason::QuotaExceeded { .. }) => exceeded += 1,
                other => panic!("unexpected decision {:?}", other),
            }
        }
        assert_eq!(allowed, 1);
        assert_eq!(exceeded, 15);
    }

    // ══════════════════════════════════════════════════════════════
    // Features
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn feature_check_leaves_counter_alone() {
        let (repo, gate) = setup();
        let merchant = MerchantId::new();
        let sub = subscribe(&repo, merchant, PlanTier::Business).await;

        let decision = gate.use_feature(&merchant, Feature::Analytics).await.unwrap();
        assert!(decision.is_allowed());
        assert_eq!(repo.find_by_id(&sub.id).await.unwrap().orders_used, 0);
    }

    #[tokio::test]
    async fn missing_feature_names_required_tier() {
        let (repo, gate) = setup();
        let merchant = MerchantId::new();
        subscribe(&repo, merchant, PlanTier::Starter).await;

        let decision = gate.use_feature(&merchant, Feature::ApiAccess).await.unwrap();
        assert_eq!(
            decision,
            GateDecision::Denied(DenialReason::FeatureNotIncluded {
                feature: Feature::ApiAccess,
                required_tier: PlanTier::Enterprise,
            })
        );
    }

    #[tokio::test]
    async fn store_outage_propagates() {
        let stores = crate::adapters::memory::InMemoryStores::new();
        let gate = SubscriptionGate::new(stores.subscriptions.clone());
        stores.outage.set(true);

        let err = gate
            .check_and_reserve(&MerchantId::new(), GateAction::CreateOrder)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
