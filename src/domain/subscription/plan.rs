//! Plan tiers and what each one includes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Starter,
    Business,
    Enterprise,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Starter => "starter",
            PlanTier::Business => "business",
            PlanTier::Enterprise => "enterprise",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(PlanTier::Free),
            "starter" => Some(PlanTier::Starter),
            "business" => Some(PlanTier::Business),
            "enterprise" => Some(PlanTier::Enterprise),
            _ => None,
        }
    }

    /// Returns the display name for this tier.
    pub fn display_name(&self) -> &'static str {
        match self {
            PlanTier::Free => "Free",
            PlanTier::Starter => "Starter",
            PlanTier::Business => "Business",
            PlanTier::Enterprise => "Enterprise",
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing period of a subscription row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monthly" => Some(BillingCycle::Monthly),
            "yearly" => Some(BillingCycle::Yearly),
            _ => None,
        }
    }

    /// Length of one period in days.
    pub fn period_days(&self) -> i64 {
        match self {
            BillingCycle::Monthly => 30,
            BillingCycle::Yearly => 365,
        }
    }
}

/// Feature flags a plan may include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    PaymentLinks,
    Analytics,
    Broadcast,
    ApiAccess,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::PaymentLinks => "payment_links",
            Feature::Analytics => "analytics",
            Feature::Broadcast => "broadcast",
            Feature::ApiAccess => "api_access",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "payment_links" => Some(Feature::PaymentLinks),
            "analytics" => Some(Feature::Analytics),
            "broadcast" => Some(Feature::Broadcast),
            "api_access" => Some(Feature::ApiAccess),
            _ => None,
        }
    }

    /// Cheapest tier that includes this feature.
    pub fn minimum_tier(&self) -> PlanTier {
        match self {
            Feature::PaymentLinks => PlanTier::Starter,
            Feature::Analytics | Feature::Broadcast => PlanTier::Business,
            Feature::ApiAccess => PlanTier::Enterprise,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quota and features for a tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub tier: PlanTier,
    /// Orders per billing cycle. None = unlimited.
    pub orders_per_cycle: Option<u32>,
    pub features: Vec<Feature>,
}

impl PlanLimits {
    /// Get the limits for a specific tier.
    ///
    /// | Tier | Orders / cycle | Features |
    /// |------|----------------|----------|
    /// | Free | 20 | none |
    /// | Starter | 200 | payment links |
    /// | Business | 1000 | payment links, analytics, broadcast |
    /// | Enterprise | Unlimited | all |
    pub fn for_tier(tier: PlanTier) -> Self {
        use Feature::*;
        let (orders_per_cycle, features) = match tier {
            PlanTier::Free => (Some(20), vec![]),
            PlanTier::Starter => (Some(200), vec![PaymentLinks]),
            PlanTier::Business => (Some(1_000), vec![PaymentLinks, Analytics, Broadcast]),
            PlanTier::Enterprise => (None, vec![PaymentLinks, Analytics, Broadcast, ApiAccess]),
        };
        Self {
            tier,
            orders_per_cycle,
            features,
        }
    }

    pub fn includes(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }
}
