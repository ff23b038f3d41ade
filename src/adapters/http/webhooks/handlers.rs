//! HTTP handlers for the inbound webhooks.
//!
//! Status codes are what the senders act on: 2xx stops redelivery, 5xx asks
//! for it, 401 flags a forged call. Permanent failures are acknowledged with
//! 200 so the sender does not retry what can never succeed.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::adapters::http::error::ErrorResponse;
use crate::adapters::http::AppState;
use crate::application::handlers::webhooks::{
    HandleChatWebhookCommand, HandlePaymentWebhookCommand, WebhookRejection,
};
use crate::domain::messaging::WebhookVerifyQuery;

use super::dto::{ChatWebhookResponse, PaymentWebhookResponse, WebhookAckResponse};

/// Headers kept with each inbound event. Anything else is dropped.
pub const CAPTURED_HEADERS: &[&str] = &[
    "content-type",
    "user-agent",
    "x-forwarded-for",
    "x-real-ip",
    "x-request-id",
    "x-hub-signature-256",
];

const HUB_SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Copies the allow-listed headers, lower-cased.
pub fn capture_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    CAPTURED_HEADERS
        .iter()
        .filter_map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .map(|v| ((*name).to_string(), v.to_string()))
        })
        .collect()
}

// ════════════════════════════════════════════════════════════════════════════════
// Chat
// ════════════════════════════════════════════════════════════════════════════════

/// GET /webhooks/chat - subscription handshake
pub async fn verify_chat_webhook(
    State(state): State<AppState>,
    Query(query): Query<WebhookVerifyQuery>,
) -> Response {
    match query.accept(&state.settings.chat_verify_token) {
        Some(challenge) => (StatusCode::OK, challenge.to_string()).into_response(),
        None => {
            tracing::warn!(mode = ?query.mode, "chat webhook handshake refused");
            let error = ErrorResponse::new("VERIFICATION_FAILED", "Verify token mismatch");
            (StatusCode::FORBIDDEN, Json(error)).into_response()
        }
    }
}

/// POST /webhooks/chat - inbound chat messages
pub async fn handle_chat_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get(HUB_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let handler = state.chat_webhook_handler();
    let cmd = HandleChatWebhookCommand {
        body: body.to_vec(),
        headers: capture_headers(&headers),
        signature,
    };

    let result = handler.handle(cmd).await?;
    Ok(Json(ChatWebhookResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Payments
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/payments - provider notifications
pub async fn handle_payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let handler = state.payment_webhook_handler();
    let cmd = HandlePaymentWebhookCommand {
        body: body.to_vec(),
        headers: capture_headers(&headers),
    };

    let result = handler.handle(cmd).await?;
    Ok(Json(PaymentWebhookResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Rejected delivery, rendered with the status its failure kind dictates.
pub struct WebhookApiError(WebhookRejection);

impl From<WebhookRejection> for WebhookApiError {
    fn from(rejection: WebhookRejection) -> Self {
        Self(rejection)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let WebhookRejection { event_id, error } = self.0;
        let status = error.status_code();

        if status.is_success() {
            let kind = error.failure_kind();
            let body = WebhookAckResponse {
                status: if kind.is_some() { "failed" } else { "ignored" },
                event_id: event_id.map(|id| id.to_string()),
                failure_kind: kind,
                detail: error.to_string(),
            };
            return (status, Json(body)).into_response();
        }

        let code = error
            .failure_kind()
            .map(|kind| kind.as_str().to_ascii_uppercase())
            .unwrap_or_else(|| "WEBHOOK_REJECTED".to_string());
        let mut body = ErrorResponse::new(code, error.to_string());
        if let Some(id) = event_id {
            body.details = Some(serde_json::json!({ "event_id": id.to_string() }));
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    use crate::domain::foundation::InboundEventId;
    use crate::domain::webhook::WebhookError;

    #[test]
    fn capture_keeps_only_allow_listed_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.4"));
        headers.insert("authorization", HeaderValue::from_static("Bearer nope"));
        headers.insert("cookie", HeaderValue::from_static("session=1"));
        headers.insert("User-Agent", HeaderValue::from_static("provider/2.0"));

        let captured = capture_headers(&headers);

        assert_eq!(captured.len(), 2);
        assert_eq!(captured["x-forwarded-for"], "198.51.100.4");
        assert_eq!(captured["user-agent"], "provider/2.0");
    }

    fn status_of(error: WebhookError) -> StatusCode {
        WebhookApiError(WebhookRejection {
            event_id: Some(InboundEventId::new()),
            error,
        })
        .into_response()
        .status()
    }

    #[test]
    fn rejection_statuses_follow_failure_kind() {
        assert_eq!(status_of(WebhookError::InvalidSignature), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(WebhookError::Database("down".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(WebhookError::ParseError("eof".to_string())),
            StatusCode::OK
        );
        assert_eq!(
            status_of(WebhookError::Unresolvable("tx-1".to_string())),
            StatusCode::OK
        );
    }
}
