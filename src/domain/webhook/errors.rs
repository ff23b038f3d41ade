//! Webhook error types shared by the chat and payment consumers.
//!
//! Every failure a webhook consumer can hit is one of these variants. Each
//! maps to a [`FailureKind`] for the event log and to the HTTP status that
//! tells the sender whether to redeliver.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::event_log::FailureKind;
use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors that occur during webhook processing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// Signature did not match the shared secret.
    #[error("Invalid signature")]
    InvalidSignature,

    /// A signature was required and none was sent.
    #[error("Missing signature")]
    MissingSignature,

    /// Payment notification for a site other than ours.
    #[error("Unknown site: {0}")]
    UnknownSite(String),

    /// Body is not valid JSON or not the expected envelope.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from webhook payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Field present but unusable.
    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Nothing internal matches the external reference.
    #[error("Unresolvable reference: {0}")]
    Unresolvable(String),

    /// Transition rejected by the order or payment rules.
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// Merchant is out of quota or has no usable subscription.
    #[error("Quota denied: {0}")]
    QuotaDenied(String),

    /// Event was intentionally ignored (not an error condition).
    #[error("Event ignored: {0}")]
    Ignored(String),

    /// Store operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if the sender should redeliver.
    pub fn is_retryable(&self) -> bool {
        self.failure_kind()
            .map(|kind| kind.is_retryable())
            .unwrap_or(false)
    }

    /// Taxonomy entry recorded in the event log. `None` for ignored events.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            WebhookError::InvalidSignature
            | WebhookError::MissingSignature
            | WebhookError::UnknownSite(_) => Some(FailureKind::Authentication),
            WebhookError::ParseError(_)
            | WebhookError::MissingField(_)
            | WebhookError::InvalidField { .. } => Some(FailureKind::MalformedInput),
            WebhookError::Unresolvable(_) => Some(FailureKind::UnresolvableReference),
            WebhookError::InvalidTransition(_) => Some(FailureKind::InvalidTransition),
            WebhookError::QuotaDenied(_) => Some(FailureKind::QuotaDenied),
            WebhookError::Database(_) => Some(FailureKind::StoreUnavailable),
            WebhookError::Ignored(_) => None,
        }
    }

    /// Maps the error to an HTTP status code.
    ///
    /// - 2xx: acknowledged, the sender stops retrying
    /// - 401: authentication failure, never retried
    /// - 5xx: transient, the sender redelivers
    pub fn status_code(&self) -> StatusCode {
        match self.failure_kind() {
            Some(FailureKind::Authentication) => StatusCode::UNAUTHORIZED,
            Some(FailureKind::StoreUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::OK,
        }
    }

    /// Whether a provider-side event is a security event.
    pub fn is_security_event(&self) -> bool {
        self.failure_kind() == Some(FailureKind::Authentication)
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::DatabaseError | ErrorCode::ConcurrentModification => {
                WebhookError::Database(err.message)
            }
            ErrorCode::InvalidStateTransition => WebhookError::InvalidTransition(err.message),
            ErrorCode::ValidationFailed => WebhookError::InvalidField {
                field: "payload",
                reason: err.message,
            },
            ErrorCode::MerchantNotFound
            | ErrorCode::CustomerNotFound
            | ErrorCode::OrderNotFound
            | ErrorCode::PaymentNotFound
            | ErrorCode::SubscriptionNotFound
            | ErrorCode::EventNotFound => WebhookError::Unresolvable(err.message),
            ErrorCode::AlreadyExists | ErrorCode::InternalError => {
                WebhookError::Database(err.message)
            }
        }
    }
}
