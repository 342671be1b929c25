use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, MessageResponse, auth::session_user_id};
use crate::models::movie::{
    CatalogPage, CatalogQuery, GenreCount, Movie, MovieSummary, RatingEntry, SortDirection,
    SortField,
};
use crate::services::VideoSource;

#[derive(Deserialize)]
pub struct MoviesQuery {
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    /// Title prefix search.
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub sort: Option<SortField>,
    #[serde(default)]
    pub direction: Option<SortDirection>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub cursor: Option<String>,
}

impl From<MoviesQuery> for CatalogQuery {
    fn from(q: MoviesQuery) -> Self {
        Self {
            genre: q.genre,
            year: q.year,
            search: q.q,
            sort_field: q.sort.unwrap_or_default(),
            sort_direction: q.direction.unwrap_or_default(),
            limit: q.limit.unwrap_or(0),
            cursor: q.cursor,
        }
    }
}

#[derive(Serialize)]
pub struct RatingsResponse {
    pub ratings: Vec<RatingEntry>,
    pub average_rating: f64,
}

#[derive(Deserialize)]
pub struct RatingRequest {
    pub score: f64,
    #[serde(default)]
    pub comment: String,
}

/// GET /movies
pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MoviesQuery>,
) -> Result<Json<ApiResponse<CatalogPage>>, ApiError> {
    let page = state.catalog().browse(query.into()).await?;
    Ok(Json(ApiResponse::success(page)))
}

/// GET /movies/featured
pub async fn featured(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Movie>>>, ApiError> {
    Ok(Json(ApiResponse::success(state.catalog().featured().await?)))
}

/// GET /movies/trending
pub async fn trending(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Movie>>>, ApiError> {
    Ok(Json(ApiResponse::success(state.catalog().trending().await?)))
}

/// GET /movies/recent
pub async fn recent(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Movie>>>, ApiError> {
    Ok(Json(ApiResponse::success(state.catalog().recent().await?)))
}

/// GET /movies/genres
pub async fn genres(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<GenreCount>>>, ApiError> {
    Ok(Json(ApiResponse::success(state.catalog().genres().await?)))
}

/// GET /movies/{id}
pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Movie>>, ApiError> {
    Ok(Json(ApiResponse::success(state.catalog().get(&id).await?)))
}

/// GET /movies/{id}/similar
pub async fn similar(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<MovieSummary>>>, ApiError> {
    Ok(Json(ApiResponse::success(
        state.catalog().similar(&id).await?,
    )))
}

/// POST /movies/{id}/view
pub async fn record_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.catalog().record_view(&id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "View recorded",
    ))))
}

/// POST /movies/{id}/download
pub async fn record_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.catalog().record_download(&id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Download recorded",
    ))))
}

/// POST /movies/{id}/rating
pub async fn rate(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
    Json(payload): Json<RatingRequest>,
) -> Result<Json<ApiResponse<RatingsResponse>>, ApiError> {
    let user_id = session_user_id(&session).await?;
    let (ratings, average_rating) = state
        .catalog()
        .rate(&id, &user_id, payload.score, payload.comment)
        .await?;
    Ok(Json(ApiResponse::success(RatingsResponse {
        ratings,
        average_rating,
    })))
}

/// GET /movies/{id}/play
/// Resolves the playable source: an issued time-limited URL for owned assets
/// or the stored external URL.
pub async fn play(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<VideoSource>>, ApiError> {
    let source = state.catalog().resolve_video_source(&id).await?;
    Ok(Json(ApiResponse::success(source)))
}
