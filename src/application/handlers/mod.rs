//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations, grouped by
//! area:
//!
//! - `webhooks` - chat and payment webhook consumers, event log service
//! - `customer` - entity resolution
//! - `order` - lifecycle manager, order commands and queries
//! - `subscription` - gate, billing cycles, usage

pub mod customer;
pub mod order;
pub mod subscription;
pub mod webhooks;
