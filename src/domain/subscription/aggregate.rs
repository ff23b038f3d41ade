//! Subscription aggregate.
//!
//! One row per billing cycle. Starting a new cycle inserts a fresh row with
//! `orders_used = 0`; the previous row is expired, never reset in place.

use serde::{Deserialize, Serialize};

use super::{BillingCycle, DenialReason, Feature, PlanLimits, PlanTier, SubscriptionStatus};
use crate::domain::foundation::{
    InvalidTransition, MerchantId, StateMachine, SubscriptionId, Timestamp,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub merchant_id: MerchantId,
    pub plan: PlanTier,
    pub status: SubscriptionStatus,
    /// None = unlimited.
    pub orders_quota: Option<u32>,
    pub orders_used: u32,
    pub billing_cycle: BillingCycle,
    pub current_period_start: Timestamp,
    pub next_billing_date: Timestamp,
    pub features: Vec<Feature>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// A new active row for one billing cycle, quota taken from the plan.
    pub fn start(
        merchant_id: MerchantId,
        plan: PlanTier,
        billing_cycle: BillingCycle,
        now: Timestamp,
    ) -> Self {
        let limits = PlanLimits::for_tier(plan);
        Self {
            id: SubscriptionId::new(),
            merchant_id,
            plan,
            status: SubscriptionStatus::Active,
            orders_quota: limits.orders_per_cycle,
            orders_used: 0,
            billing_cycle,
            current_period_start: now,
            next_billing_date: now.add_days(billing_cycle.period_days()),
            features: limits.features,
            created_at: now,
            updated_at: now,
        }
    }

    /// Why this row cannot take orders right now, ignoring the quota.
    pub fn standing_denial(&self, now: &Timestamp) -> Option<DenialReason> {
        match self.status {
            SubscriptionStatus::Cancelled => Some(DenialReason::SubscriptionCancelled),
            SubscriptionStatus::Expired => Some(DenialReason::SubscriptionExpired),
            SubscriptionStatus::Suspended => Some(DenialReason::SubscriptionSuspended),
            SubscriptionStatus::Active if now.is_after(&self.next_billing_date) => {
                Some(DenialReason::SubscriptionExpired)
            }
            SubscriptionStatus::Active => None,
        }
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Orders left this cycle. None = unlimited.
    pub fn remaining(&self) -> Option<u32> {
        self.orders_quota
            .map(|quota| quota.saturating_sub(self.orders_used))
    }

    pub fn quota_reached(&self) -> bool {
        self.remaining() == Some(0)
    }

    /// Moves the row to a new status through the allow-list.
    pub fn transition(
        &mut self,
        target: SubscriptionStatus,
    ) -> Result<(), InvalidTransition<SubscriptionStatus>> {
        self.status = self.status.transition_to(target)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(plan: PlanTier) -> Subscription {
        Subscription::start(MerchantId::new(), plan, BillingCycle::Monthly, Timestamp::now())
    }

    #[test]
    fn start_takes_quota_from_plan() {
        let sub = active(PlanTier::Starter);
        assert_eq!(sub.orders_quota, Some(200));
        assert_eq!(sub.orders_used, 0);
        assert!(sub.has_feature(Feature::PaymentLinks));
        assert_eq!(sub.next_billing_date, sub.current_period_start.add_days(30));
    }

    #[test]
    fn yearly_cycle_lasts_365_days() {
        let now = Timestamp::now();
        let sub = Subscription::start(MerchantId::new(), PlanTier::Free, BillingCycle::Yearly, now);
        assert_eq!(sub.next_billing_date, now.add_days(365));
    }

    #[test]
    fn active_in_period_has_no_denial() {
        let sub = active(PlanTier::Free);
        assert_eq!(sub.standing_denial(&Timestamp::now()), None);
    }

    #[test]
    fn active_past_billing_date_is_expired() {
        let sub = active(PlanTier::Free);
        let later = sub.next_billing_date.add_minutes(1);
        assert_eq!(sub.standing_denial(&later), Some(DenialReason::SubscriptionExpired));
    }

    #[test]
    fn non_active_statuses_map_to_reasons() {
        let now = Timestamp::now();
        let cases = [
            (SubscriptionStatus::Cancelled, DenialReason::SubscriptionCancelled),
            (SubscriptionStatus::Expired, DenialReason::SubscriptionExpired),
            (SubscriptionStatus::Suspended, DenialReason::SubscriptionSuspended),
        ];
        for (status, reason) in cases {
            let mut sub = active(PlanTier::Free);
            sub.status = status;
            assert_eq!(sub.standing_denial(&now), Some(reason));
        }
    }

    #[test]
    fn remaining_counts_down() {
        let mut sub = active(PlanTier::Free);
        sub.orders_used = 19;
        assert_eq!(sub.remaining(), Some(1));
        sub.orders_used = 20;
        assert!(sub.quota_reached());
        assert_eq!(active(PlanTier::Enterprise).remaining(), None);
    }

    #[test]
    fn transition_follows_allow_list() {
        let mut sub = active(PlanTier::Free);
        sub.transition(SubscriptionStatus::Expired).unwrap();
        assert!(sub.transition(SubscriptionStatus::Active).is_err());
    }
}
