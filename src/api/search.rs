use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, SearchQuery};
use crate::api::validation::{parse_kind, validate_search_query};
use crate::clients::igdb::IgdbStatus;
use crate::models::media::MediaKind;
use crate::models::metadata::MetadataMatch;

/// GET /search/{kind}?q=
/// Kind-dispatched metadata search: games go to IGDB, books to Google
/// Books, everything TV- or film-shaped to TMDB.
pub async fn search_kind(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<MetadataMatch>>>, ApiError> {
    let kind = parse_kind(&kind)?;
    let query = validate_search_query(&params.q)?;

    let results = state.metadata_service.search(kind, query).await?;
    Ok(Json(ApiResponse::success(results)))
}

/// GET /search/all?q=
/// Combined search across every source, best effort per source.
pub async fn search_all(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<MetadataMatch>>>, ApiError> {
    let query = validate_search_query(&params.q)?;

    let results = state.metadata_service.search_all(query).await?;
    Ok(Json(ApiResponse::success(results)))
}

/// GET /igdb/games?q=
/// Throttled IGDB game search (endpoint name kept from the original
/// client API).
pub async fn igdb_games(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<MetadataMatch>>>, ApiError> {
    let query = validate_search_query(&params.q)?;

    let results = state
        .metadata_service
        .search(MediaKind::Games, query)
        .await?;
    Ok(Json(ApiResponse::success(results)))
}

/// GET /igdb/status
/// Token validity and limiter occupancy.
pub async fn igdb_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<IgdbStatus>>, ApiError> {
    let status = state.metadata_service.igdb_status().await;
    Ok(Json(ApiResponse::success(status)))
}
