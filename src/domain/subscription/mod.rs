//! Subscription domain module.
//!
//! - `plan` - tiers, billing cycles, features and per-tier limits
//! - `status` - subscription status machine
//! - `aggregate` - one billing-cycle row
//! - `gate` - gate actions, decisions, reservations and denial reasons

mod aggregate;
mod gate;
mod plan;
mod status;

pub use aggregate::Subscription;
pub use gate::{DenialReason, GateAction, GateDecision, Reservation};
pub use plan::{BillingCycle, Feature, PlanLimits, PlanTier};
pub use status::SubscriptionStatus;
