//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, the state machine trait and error
//! types that form the vocabulary of the reconciliation engine.

mod errors;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{CustomerId, InboundEventId, MerchantId, OrderId, PaymentId, SubscriptionId};
pub use money::{Currency, Money};
pub use state_machine::{InvalidTransition, StateMachine};
pub use timestamp::Timestamp;
