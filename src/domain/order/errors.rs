//! Order domain errors.

use thiserror::Error;

use super::{OrderPaymentStatus, OrderStatus};
use crate::domain::foundation::{DomainError, ErrorCode, InvalidTransition, ValidationError};

/// Errors raised by the order aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("order has no line items")]
    NoItems,

    #[error("invalid line item: {0}")]
    InvalidItem(#[from] ValidationError),

    #[error("invalid status transition: {0}")]
    Status(InvalidTransition<OrderStatus>),

    #[error("invalid payment status transition: {0}")]
    PaymentStatus(InvalidTransition<OrderPaymentStatus>),

    /// Payment may only settle while the order is pending or confirmed.
    #[error("payment cannot be marked paid while order is {status}")]
    PaymentNotAccepted { status: OrderStatus },
}

impl OrderError {
    /// True for the rejected-transition family.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            OrderError::Status(_)
                | OrderError::PaymentStatus(_)
                | OrderError::PaymentNotAccepted { .. }
        )
    }

    /// `(from, to)` as strings, for reporting.
    pub fn transition_pair(&self) -> Option<(String, String)> {
        match self {
            OrderError::Status(t) => Some((t.from.to_string(), t.to.to_string())),
            OrderError::PaymentStatus(t) => Some((t.from.to_string(), t.to.to_string())),
            OrderError::PaymentNotAccepted { status } => {
                Some((status.to_string(), OrderStatus::Paid.to_string()))
            }
            _ => None,
        }
    }
}

impl From<InvalidTransition<OrderStatus>> for OrderError {
    fn from(err: InvalidTransition<OrderStatus>) -> Self {
        OrderError::Status(err)
    }
}

impl From<InvalidTransition<OrderPaymentStatus>> for OrderError {
    fn from(err: InvalidTransition<OrderPaymentStatus>) -> Self {
        OrderError::PaymentStatus(err)
    }
}

impl From<OrderError> for DomainError {
    fn from(err: OrderError) -> Self {
        let message = err.to_string();
        match err.transition_pair() {
            Some((from, to)) => DomainError::new(ErrorCode::InvalidStateTransition, message)
                .with_detail("from", from)
                .with_detail("to", to),
            None => DomainError::new(ErrorCode::ValidationFailed, message),
        }
    }
}
