//! HTTP handlers for order endpoints.

use std::collections::HashMap;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::AppState;
use crate::application::handlers::order::{
    CreateOrderCommand, CreateOrderResult, GetOrderQuery, InitiatePaymentCommand,
    UpdateOrderStatusCommand,
};
use crate::domain::foundation::{Currency, DomainError, MerchantId, Money, OrderId};
use crate::domain::order::{LineItem, OrderSource};

use super::dto::{
    CreateOrderRequest, CreateOrderResponse, InitiatePaymentRequest, OrderItemRequest,
    OrderTransitionResponse, UpdateOrderStatusRequest,
};

/// POST /api/merchants/:merchant_id/orders - gated direct order creation
pub async fn create_order(
    State(state): State<AppState>,
    Path(merchant_id): Path<MerchantId>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resolver = state.entity_resolver();
    let merchant = resolver.merchant(&merchant_id).await?;
    let customer = resolver
        .resolve_customer(&merchant.id, &request.customer_handle, request.customer_name)
        .await?;

    let items = price_items(&state, &merchant.id, request.items).await?;
    let currency = request.currency.map(Currency::new).transpose().map_err(DomainError::from)?;

    let result = state
        .create_order_handler()
        .handle(CreateOrderCommand {
            merchant_id: merchant.id,
            customer_id: customer.id,
            items,
            currency,
            source: OrderSource::Api,
            source_message_id: request.reference,
            delivery_address: request.delivery_address,
            note: request.note,
            needs_clarification: false,
        })
        .await?;

    match result {
        CreateOrderResult::Created {
            order,
            quota_exhausted,
        } => Ok((
            StatusCode::CREATED,
            Json(CreateOrderResponse {
                order,
                duplicate: false,
                quota_exhausted,
            }),
        )),
        CreateOrderResult::Duplicate { order_id } => {
            let order = state
                .orders
                .find_by_id(&order_id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("order {} not found", order_id)))?;
            Ok((
                StatusCode::OK,
                Json(CreateOrderResponse {
                    order,
                    duplicate: true,
                    quota_exhausted: false,
                }),
            ))
        }
        CreateOrderResult::Denied(reason) => Err(ApiError::Denied(reason)),
    }
}

/// Explicit prices win; the catalog fills in the rest.
async fn price_items(
    state: &AppState,
    merchant_id: &MerchantId,
    items: Vec<OrderItemRequest>,
) -> Result<Vec<LineItem>, DomainError> {
    let mut looked_up: HashMap<String, Money> = HashMap::new();
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let unit_price = match item.unit_price {
            Some(minor) => Money::new(minor)?,
            None => match looked_up.get(&item.name) {
                Some(price) => *price,
                None => {
                    let price = state.prices.lookup_price(merchant_id, &item.name).await?;
                    looked_up.insert(item.name.clone(), price);
                    price
                }
            },
        };
        lines.push(LineItem::new(item.name, item.quantity, unit_price)?);
    }
    Ok(lines)
}

/// GET /api/orders/:order_id - order with its payment attempts
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .get_order_handler()
        .handle(GetOrderQuery { order_id })
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order {} not found", order_id)))?;
    Ok(Json(view))
}

/// PATCH /api/orders/:order_id/status - merchant-driven transition
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .update_order_status_handler()
        .handle(UpdateOrderStatusCommand {
            order_id,
            status: request.status,
        })
        .await?;
    Ok(Json(OrderTransitionResponse::from(report)))
}

/// POST /api/orders/:order_id/payments - open a payment attempt
pub async fn initiate_payment(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
    request: Option<Json<InitiatePaymentRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = request.unwrap_or_default();
    let payment = state
        .initiate_payment_handler()
        .handle(InitiatePaymentCommand {
            order_id,
            payment_method: request.payment_method,
            payer_phone: request.payer_phone,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}
