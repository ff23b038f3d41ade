//! Axum router for subscription endpoints.

use axum::{routing::get, Router};

use super::handlers::{get_usage, start_subscription};
use crate::adapters::http::AppState;

/// # Routes
/// - `GET /merchants/:merchant_id/subscription` - usage view
/// - `POST /merchants/:merchant_id/subscription` - start a billing cycle
pub fn subscription_routes() -> Router<AppState> {
    Router::new().route(
        "/merchants/:merchant_id/subscription",
        get(get_usage).post(start_subscription),
    )
}
