use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, LogDto, LogResponse, SystemStatus};
use crate::config::Config;
use crate::constants::VERSION;

/// GET /system/status
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SystemStatus>>, ApiError> {
    let store = state.store();

    let total_users = store.list_users().await?.len();
    let total_entries = store.count_media().await?;
    let webhook_backlog = store.webhook_backlog().await?;

    let config = state.config().read().await;

    Ok(Json(ApiResponse::success(SystemStatus {
        version: VERSION.to_string(),
        uptime: state.start_time.elapsed().as_secs(),
        total_users,
        total_entries,
        webhook_backlog,
        stripe_enabled: config.stripe.enabled,
        mercadopago_enabled: config.mercadopago.enabled,
    })))
}

/// GET /system/config
pub async fn get_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Config>>, ApiError> {
    let mut config = state.config().read().await.clone();

    // Never ship secrets to the client.
    config.igdb.client_secret = String::new();
    config.stripe.secret_key = String::new();
    config.stripe.webhook_secret = String::new();
    config.mercadopago.access_token = String::new();
    config.mercadopago.webhook_secret = String::new();

    Ok(Json(ApiResponse::success(config)))
}

/// PUT /system/config
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(mut new_config): Json<Config>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    // Redacted fields come back empty; keep the stored secrets.
    {
        let current = state.config().read().await;
        if new_config.igdb.client_secret.is_empty() {
            new_config.igdb.client_secret = current.igdb.client_secret.clone();
        }
        if new_config.stripe.secret_key.is_empty() {
            new_config.stripe.secret_key = current.stripe.secret_key.clone();
        }
        if new_config.stripe.webhook_secret.is_empty() {
            new_config.stripe.webhook_secret = current.stripe.webhook_secret.clone();
        }
        if new_config.mercadopago.access_token.is_empty() {
            new_config.mercadopago.access_token = current.mercadopago.access_token.clone();
        }
        if new_config.mercadopago.webhook_secret.is_empty() {
            new_config.mercadopago.webhook_secret = current.mercadopago.webhook_secret.clone();
        }
    }

    new_config
        .validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    new_config
        .save()
        .map_err(|e| ApiError::internal(format!("Failed to save config: {e}")))?;

    *state.config().write().await = new_config;

    Ok(Json(ApiResponse::success(())))
}

#[derive(Deserialize)]
pub struct LogQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub level: Option<String>,
    pub event_type: Option<String>,
}

const fn default_page() -> u64 {
    1
}

const fn default_page_size() -> u64 {
    50
}

/// GET /system/logs
pub async fn get_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogQuery>,
) -> Result<Json<ApiResponse<LogResponse>>, ApiError> {
    let page_size = params.page_size.clamp(1, 500);

    let (logs, total_pages) = state
        .store()
        .get_logs(
            params.page.max(1),
            page_size,
            params.level,
            params.event_type,
        )
        .await?;

    let logs = logs
        .into_iter()
        .map(|log| LogDto {
            id: log.id,
            event_type: log.event_type,
            level: log.level,
            message: log.message,
            details: log.details,
            created_at: log.created_at,
        })
        .collect();

    Ok(Json(ApiResponse::success(LogResponse { logs, total_pages })))
}

/// DELETE /system/logs
pub async fn clear_logs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.store().clear_logs().await?;
    Ok(Json(ApiResponse::success(())))
}
