//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors, state machines)
//! - `event_log` - Inbound webhook audit records and the failure taxonomy
//! - `customer` - Merchants and their customers
//! - `order` - Order aggregate and its status rules
//! - `payment` - Payment attempts, provider vocabulary and signatures
//! - `messaging` - Chat envelope and the message interpreter
//! - `subscription` - Plans, quota and gate decisions
//! - `webhook` - Errors and signing helpers shared by webhook consumers

pub mod customer;
pub mod event_log;
pub mod foundation;
pub mod messaging;
pub mod order;
pub mod payment;
pub mod subscription;
pub mod webhook;
