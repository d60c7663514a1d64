use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, ListMediaQuery, MediaEntryDto, StatsDto};
use crate::api::validation::{parse_kind, parse_status, validate_media_id};
use crate::db::MediaFilter;
use crate::domain::{MediaId, UserId};
use crate::models::media::MediaDraft;

pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
    Query(params): Query<ListMediaQuery>,
) -> Result<Json<ApiResponse<Vec<MediaEntryDto>>>, ApiError> {
    let mut filter = MediaFilter::default();

    if let Some(kind) = &params.kind {
        filter.kind = Some(parse_kind(kind)?);
    }
    if let Some(status) = &params.status {
        filter.status = Some(parse_status(status)?);
    }
    filter.title = params.q.filter(|q| !q.trim().is_empty());

    let entries = state
        .media_service
        .list_entries(UserId::new(current.id), filter)
        .await?;

    let dtos = entries.into_iter().map(MediaEntryDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MediaEntryDto>>, ApiError> {
    let id = validate_media_id(id)?;

    let entry = state
        .media_service
        .get_entry(UserId::new(current.id), MediaId::new(id))
        .await?;

    Ok(Json(ApiResponse::success(MediaEntryDto::from(entry))))
}

pub async fn add_entry(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
    Json(draft): Json<MediaDraft>,
) -> Result<Json<ApiResponse<MediaEntryDto>>, ApiError> {
    let entry = state
        .media_service
        .add_entry(UserId::new(current.id), draft)
        .await?;

    Ok(Json(ApiResponse::success(MediaEntryDto::from(entry))))
}

pub async fn update_entry(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(draft): Json<MediaDraft>,
) -> Result<Json<ApiResponse<MediaEntryDto>>, ApiError> {
    let id = validate_media_id(id)?;

    let entry = state
        .media_service
        .update_entry(UserId::new(current.id), MediaId::new(id), draft)
        .await?;

    Ok(Json(ApiResponse::success(MediaEntryDto::from(entry))))
}

pub async fn remove_entry(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let id = validate_media_id(id)?;

    state
        .media_service
        .remove_entry(UserId::new(current.id), MediaId::new(id))
        .await?;

    Ok(Json(ApiResponse::success(())))
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
) -> Result<Json<ApiResponse<StatsDto>>, ApiError> {
    let stats = state.media_service.stats(UserId::new(current.id)).await?;

    Ok(Json(ApiResponse::success(StatsDto { stats })))
}
