//! Error bodies and the `DomainError` to HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::subscription::DenialReason;

/// JSON error body: `{ "code": ..., "message": ... }`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain failures to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    /// The subscription gate refused the action.
    Denied(DenialReason),
    NotFound(String),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Domain(err) => {
                let status = match err.code {
                    ErrorCode::ValidationFailed | ErrorCode::InvalidStateTransition => {
                        StatusCode::BAD_REQUEST
                    }
                    ErrorCode::MerchantNotFound
                    | ErrorCode::CustomerNotFound
                    | ErrorCode::OrderNotFound
                    | ErrorCode::PaymentNotFound
                    | ErrorCode::SubscriptionNotFound
                    | ErrorCode::EventNotFound => StatusCode::NOT_FOUND,
                    ErrorCode::AlreadyExists | ErrorCode::ConcurrentModification => {
                        StatusCode::CONFLICT
                    }
                    ErrorCode::DatabaseError => StatusCode::SERVICE_UNAVAILABLE,
                    ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    tracing::error!(code = %err.code, error = %err.message, "request failed");
                }
                let body = if err.details.is_empty() {
                    ErrorResponse::new(err.code.to_string(), err.message)
                } else {
                    ErrorResponse::with_details(
                        err.code.to_string(),
                        err.message,
                        serde_json::json!(err.details),
                    )
                };
                (status, body)
            }
            ApiError::Denied(reason) => (
                StatusCode::PAYMENT_REQUIRED,
                ErrorResponse::with_details(
                    reason.code().to_ascii_uppercase(),
                    reason.user_message(),
                    serde_json::json!(reason),
                ),
            ),
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, ErrorResponse::new("NOT_FOUND", message))
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain(code: ErrorCode) -> ApiError {
        ApiError::from(DomainError::new(code, "x"))
    }

    #[test]
    fn error_response_omits_empty_details() {
        let body = serde_json::to_value(ErrorResponse::new("VALIDATION_FAILED", "bad")).unwrap();
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert!(body.get("details").is_none());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Mapping Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn api_error_maps_validation_to_400() {
        let response = domain(ErrorCode::ValidationFailed).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_maps_invalid_transition_to_400() {
        let response = domain(ErrorCode::InvalidStateTransition).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_maps_order_not_found_to_404() {
        let response = domain(ErrorCode::OrderNotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn api_error_maps_concurrent_modification_to_409() {
        let response = domain(ErrorCode::ConcurrentModification).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn api_error_maps_database_to_503() {
        let response = domain(ErrorCode::DatabaseError).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn api_error_maps_internal_to_500() {
        let response = domain(ErrorCode::InternalError).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn api_error_maps_denial_to_402() {
        let err = ApiError::Denied(DenialReason::QuotaExceeded { used: 20, limit: 20 });
        assert_eq!(err.into_response().status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn api_error_maps_missing_resource_to_404() {
        let err = ApiError::NotFound("order 7 not found".to_string());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
