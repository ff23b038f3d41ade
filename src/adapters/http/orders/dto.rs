//! HTTP DTOs for order endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::order::TransitionReport;
use crate::domain::order::{Order, OrderStatus};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Direct order entry by the merchant's back office.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    /// Customer phone number or chat id.
    pub customer_handle: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub items: Vec<OrderItemRequest>,
    /// ISO 4217 code; the merchant's default when absent.
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    /// Client idempotency key. A repeated key returns the first order.
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemRequest {
    pub name: String,
    pub quantity: u32,
    /// Minor units. Looked up in the catalog when absent.
    #[serde(default)]
    pub unit_price: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitiatePaymentRequest {
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payer_phone: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderResponse {
    #[serde(flatten)]
    pub order: Order,
    /// The request repeated an earlier reference.
    pub duplicate: bool,
    /// This order used the last slot of the billing cycle.
    pub quota_exhausted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderTransitionResponse {
    #[serde(flatten)]
    pub order: Order,
    /// False when the order already had the requested state.
    pub changed: bool,
}

impl From<TransitionReport> for OrderTransitionResponse {
    fn from(report: TransitionReport) -> Self {
        Self {
            changed: report.outcome.is_applied(),
            order: report.order,
        }
    }
}
