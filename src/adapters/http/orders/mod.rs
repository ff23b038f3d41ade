//! HTTP adapter for order endpoints.
//!
//! - `POST /api/merchants/:merchant_id/orders` - direct order creation (gated)
//! - `GET /api/orders/:order_id` - order with its payments
//! - `PATCH /api/orders/:order_id/status` - human-driven status transition
//! - `POST /api/orders/:order_id/payments` - initiate a payment attempt

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::order_routes;
