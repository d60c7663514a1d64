//! Provider-facing webhook endpoints.
//!
//! Mounted outside the auth middleware: authenticity comes from the
//! signature headers, not from sessions or API keys. The contract with
//! both providers is the same — 400 before any state change on a bad
//! signature, 200 once the event is durably stored (or was already
//! stored); processing failures never bubble into the response.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::services::WebhookReceipt;

/// POST /webhooks/stripe
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<WebhookReceipt>>, ApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::validation("Missing Stripe-Signature header"))?;

    let receipt = state
        .billing_service
        .ingest_stripe(&body, signature)
        .await?;

    Ok(Json(ApiResponse::success(receipt)))
}

/// POST /webhooks/mercadopago
pub async fn mercadopago_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<WebhookReceipt>>, ApiError> {
    let signature = headers
        .get("x-signature")
        .and_then(|value| value.to_str().ok());
    let request_id = headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok());

    let receipt = state
        .billing_service
        .ingest_mercadopago(&body, signature, request_id)
        .await?;

    Ok(Json(ApiResponse::success(receipt)))
}
