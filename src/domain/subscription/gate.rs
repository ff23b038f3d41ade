//! Gate decision types.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Feature, PlanTier};
use crate::domain::foundation::{MerchantId, SubscriptionId};

/// What the merchant is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateAction {
    /// Consumes one order from the cycle quota.
    CreateOrder,
    /// Needs a plan feature; consumes nothing.
    UseFeature { feature: Feature },
}

/// A slot held against the quota.
///
/// Commit it when the guarded action durably succeeds, release it when the
/// action fails. A reservation with `counted == false` held no slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use = "a reservation must be committed or released"]
pub struct Reservation {
    pub subscription_id: SubscriptionId,
    pub merchant_id: MerchantId,
    /// Counter value after this reservation, when the quota is finite.
    pub used_after: Option<u32>,
    pub limit: Option<u32>,
    pub counted: bool,
}

impl Reservation {
    /// True when this reservation took the last slot of the cycle.
    pub fn exhausts_quota(&self) -> bool {
        matches!((self.used_after, self.limit), (Some(used), Some(limit)) if used >= limit)
    }
}

/// Reason why the gate said no.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DenialReason {
    /// Merchant has no active subscription row.
    NoSubscription,
    SubscriptionCancelled,
    SubscriptionExpired,
    SubscriptionSuspended,
    /// Cycle quota is used up.
    QuotaExceeded { used: u32, limit: u32 },
    /// Feature requires a higher tier.
    FeatureNotIncluded {
        feature: Feature,
        required_tier: PlanTier,
    },
}

impl DenialReason {
    /// Machine-readable code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            DenialReason::NoSubscription => "no_subscription",
            DenialReason::SubscriptionCancelled => "subscription_cancelled",
            DenialReason::SubscriptionExpired => "subscription_expired",
            DenialReason::SubscriptionSuspended => "subscription_suspended",
            DenialReason::QuotaExceeded { .. } => "quota_exceeded",
            DenialReason::FeatureNotIncluded { .. } => "feature_not_included",
        }
    }

    /// Get a merchant-facing message for the denial reason.
    pub fn user_message(&self) -> String {
        match self {
            DenialReason::NoSubscription => {
                "A subscription is required to take orders.".to_string()
            }
            DenialReason::SubscriptionCancelled => {
                "Your subscription was cancelled. Subscribe again to take orders.".to_string()
            }
            DenialReason::SubscriptionExpired => {
                "Your subscription has expired. Please renew to continue.".to_string()
            }
            DenialReason::SubscriptionSuspended => {
                "Your subscription is suspended. Contact support.".to_string()
            }
            DenialReason::QuotaExceeded { used, limit } => format!(
                "You've used {} of {} orders this cycle. Upgrade for more.",
                used, limit
            ),
            DenialReason::FeatureNotIncluded {
                feature,
                required_tier,
            } => format!(
                "{} requires the {} plan or higher.",
                feature,
                required_tier.display_name()
            ),
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Result of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed(Reservation),
    Denied(DenialReason),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, GateDecision::Denied(_))
    }

    /// Converts the decision to a Result type, with denied becoming an error.
    pub fn into_result(self) -> Result<Reservation, DenialReason> {
        match self {
            GateDecision::Allowed(reservation) => Ok(reservation),
            GateDecision::Denied(reason) => Err(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quota_exceeded_serializes_with_tag() {
        let reason = DenialReason::QuotaExceeded { used: 20, limit: 20 };
        assert_eq!(
            serde_json::to_value(&reason).unwrap(),
            json!({"type": "quota_exceeded", "used": 20, "limit": 20})
        );
    }

    #[test]
    fn unit_reasons_serialize_as_type_only() {
        assert_eq!(
            serde_json::to_value(DenialReason::NoSubscription).unwrap(),
            json!({"type": "no_subscription"})
        );
    }

    #[test]
    fn code_matches_serialized_tag() {
        for reason in [
            DenialReason::NoSubscription,
            DenialReason::SubscriptionCancelled,
            DenialReason::SubscriptionExpired,
            DenialReason::SubscriptionSuspended,
            DenialReason::QuotaExceeded { used: 1, limit: 1 },
            DenialReason::FeatureNotIncluded {
                feature: Feature::Analytics,
                required_tier: PlanTier::Business,
            },
        ] {
            let value = serde_json::to_value(&reason).unwrap();
            assert_eq!(value["type"], reason.code());
        }
    }

    #[test]
    fn quota_message_names_both_numbers() {
        let msg = DenialReason::QuotaExceeded { used: 200, limit: 200 }.user_message();
        assert!(msg.contains("200 of 200"));
    }

    #[test]
    fn last_slot_exhausts_quota() {
        let reservation = Reservation {
            subscription_id: SubscriptionId::new(),
            merchant_id: MerchantId::new(),
            used_after: Some(20),
            limit: Some(20),
            counted: true,
        };
        assert!(reservation.exhausts_quota());
        assert!(!Reservation { used_after: Some(19), ..reservation.clone() }.exhausts_quota());
        assert!(!Reservation { limit: None, ..reservation }.exhausts_quota());
    }
}
