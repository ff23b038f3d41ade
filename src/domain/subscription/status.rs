//! Subscription status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Lifecycle of one subscription row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    /// Merchant cancelled; the row no longer grants orders.
    Cancelled,
    /// Period ended or replaced by a new billing-cycle row.
    Expired,
    /// Held by the operator, for example after a chargeback.
    Suspended,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|status| status.as_str() == s)
    }
}

impl StateMachine for SubscriptionStatus {
    const ALL: &'static [Self] = &[
        SubscriptionStatus::Active,
        SubscriptionStatus::Cancelled,
        SubscriptionStatus::Expired,
        SubscriptionStatus::Suspended,
    ];

    fn valid_transitions(&self) -> &'static [Self] {
        use SubscriptionStatus::*;
        match self {
            Active => &[Cancelled, Expired, Suspended],
            Suspended => &[Active, Cancelled, Expired],
            Cancelled => &[Expired],
            Expired => &[],
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
