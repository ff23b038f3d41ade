//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - axum routes for webhooks and the order API
//! - `postgres` - sqlx-backed stores
//! - `memory` - in-memory stores for tests and local runs
//! - `notifications` - notifier implementations
//! - `pricing` - catalog price lookup

pub mod http;
pub mod memory;
pub mod notifications;
pub mod postgres;
pub mod pricing;
