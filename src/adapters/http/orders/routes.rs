//! Axum router for order endpoints.

use axum::{
    routing::{get, patch, post},
    Router,
};

use super::handlers::{create_order, get_order, initiate_payment, update_order_status};
use crate::adapters::http::AppState;

/// # Routes
/// - `POST /merchants/:merchant_id/orders` - create an order
/// - `GET /orders/:order_id` - order with payments
/// - `PATCH /orders/:order_id/status` - status transition
/// - `POST /orders/:order_id/payments` - initiate a payment
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/merchants/:merchant_id/orders", post(create_order))
        .route("/orders/:order_id", get(get_order))
        .route("/orders/:order_id/status", patch(update_order_status))
        .route("/orders/:order_id/payments", post(initiate_payment))
}
