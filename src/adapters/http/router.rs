//! Full application router.

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::orders::order_routes;
use super::subscriptions::subscription_routes;
use super::webhooks::webhook_routes;
use super::AppState;

/// Builds the router with tracing and the request timeout applied.
///
/// ```text
/// GET  /health
/// /webhooks/...   inbound deliveries
/// /api/...        orders and subscriptions
/// ```
pub fn app_router(state: AppState) -> Router {
    let timeout = state.settings.request_timeout;
    let api = Router::new()
        .merge(order_routes())
        .merge(subscription_routes());

    Router::new()
        .route("/health", get(health))
        .nest("/webhooks", webhook_routes())
        .nest("/api", api)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": env!("CARGO_PKG_NAME") })),
    )
}
