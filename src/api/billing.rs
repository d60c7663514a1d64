use axum::{Json, extract::State};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, CheckoutDto, PreferenceDto, SubscriptionDto};
use crate::domain::UserId;

/// GET /billing/subscription
pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
) -> Result<Json<ApiResponse<SubscriptionDto>>, ApiError> {
    let subscription = state
        .billing_service
        .current_subscription(UserId::new(current.id))
        .await?;

    Ok(Json(ApiResponse::success(SubscriptionDto::from(
        subscription,
    ))))
}

/// POST /billing/stripe/checkout
pub async fn stripe_checkout(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
) -> Result<Json<ApiResponse<CheckoutDto>>, ApiError> {
    let url = state
        .billing_service
        .create_stripe_checkout(UserId::new(current.id))
        .await?;

    Ok(Json(ApiResponse::success(CheckoutDto { url })))
}

/// POST /billing/stripe/portal
pub async fn stripe_portal(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
) -> Result<Json<ApiResponse<CheckoutDto>>, ApiError> {
    let url = state
        .billing_service
        .create_stripe_portal(UserId::new(current.id))
        .await?;

    Ok(Json(ApiResponse::success(CheckoutDto { url })))
}

/// POST /billing/mercadopago/preference
pub async fn mercadopago_preference(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
) -> Result<Json<ApiResponse<PreferenceDto>>, ApiError> {
    let preference = state
        .billing_service
        .create_mp_preference(UserId::new(current.id))
        .await?;

    Ok(Json(ApiResponse::success(PreferenceDto {
        preference_id: preference.id,
        init_point: preference.init_point,
    })))
}
