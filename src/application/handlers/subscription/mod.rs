//! Subscription handlers.
//!
//! ## Gate
//! - `SubscriptionGate` - reserve, commit and release order slots
//!
//! ## Commands
//! - Starting a billing-cycle row
//!
//! ## Queries
//! - Quota and usage view

mod get_usage;
mod start_subscription;
mod subscription_gate;

pub use get_usage::{GetUsageHandler, GetUsageQuery, UsageView};
pub use start_subscription::{
    StartSubscriptionCommand, StartSubscriptionHandler, StartSubscriptionResult,
};
pub use subscription_gate::SubscriptionGate;
