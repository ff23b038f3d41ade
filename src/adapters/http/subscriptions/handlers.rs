//! HTTP handlers for subscription endpoints.

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::AppState;
use crate::application::handlers::subscription::{GetUsageQuery, StartSubscriptionCommand};
use crate::domain::foundation::MerchantId;

use super::dto::{StartSubscriptionRequest, StartSubscriptionResponse};

/// GET /api/merchants/:merchant_id/subscription - quota and usage
pub async fn get_usage(
    State(state): State<AppState>,
    Path(merchant_id): Path<MerchantId>,
) -> Result<impl IntoResponse, ApiError> {
    let usage = state
        .usage_handler()
        .handle(GetUsageQuery { merchant_id })
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("merchant {} has no subscription", merchant_id))
        })?;
    Ok(Json(usage))
}

/// POST /api/merchants/:merchant_id/subscription - start a billing cycle
pub async fn start_subscription(
    State(state): State<AppState>,
    Path(merchant_id): Path<MerchantId>,
    Json(request): Json<StartSubscriptionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.entity_resolver().merchant(&merchant_id).await?;

    let result = state
        .start_subscription_handler()
        .handle(StartSubscriptionCommand {
            merchant_id,
            plan: request.plan,
            billing_cycle: request.billing_cycle,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(StartSubscriptionResponse::from(result)),
    ))
}
