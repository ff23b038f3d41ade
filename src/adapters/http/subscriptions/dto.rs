//! HTTP DTOs for subscription endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::subscription::StartSubscriptionResult;
use crate::domain::foundation::SubscriptionId;
use crate::domain::subscription::{BillingCycle, PlanTier, Subscription};

#[derive(Debug, Clone, Deserialize)]
pub struct StartSubscriptionRequest {
    pub plan: PlanTier,
    #[serde(default = "default_cycle")]
    pub billing_cycle: BillingCycle,
}

fn default_cycle() -> BillingCycle {
    BillingCycle::Monthly
}

#[derive(Debug, Clone, Serialize)]
pub struct StartSubscriptionResponse {
    #[serde(flatten)]
    pub subscription: Subscription,
    /// The row expired to make room, if any.
    pub replaced: Option<SubscriptionId>,
}

impl From<StartSubscriptionResult> for StartSubscriptionResponse {
    fn from(result: StartSubscriptionResult) -> Self {
        Self {
            subscription: result.subscription,
            replaced: result.replaced.map(|s| s.id),
        }
    }
}
