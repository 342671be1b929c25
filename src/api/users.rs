use axum::{Json, extract::State};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, auth::session_user_id};
use crate::models::user::{HistoryEntry, Preferences, User, WatchlistEntry};

#[derive(Deserialize)]
pub struct MovieRef {
    pub movie_id: String,
}

#[derive(Deserialize)]
pub struct ProfileUpdateRequest {
    pub display_name: String,
}

/// GET /users/me/watchlist
pub async fn get_watchlist(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<WatchlistEntry>>>, ApiError> {
    let user_id = session_user_id(&session).await?;
    Ok(Json(ApiResponse::success(
        state.library().watchlist(&user_id).await?,
    )))
}

/// POST /users/me/watchlist
/// Toggles the movie: present → removed, absent → added.
pub async fn toggle_watchlist(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<MovieRef>,
) -> Result<Json<ApiResponse<Vec<WatchlistEntry>>>, ApiError> {
    let user_id = session_user_id(&session).await?;
    Ok(Json(ApiResponse::success(
        state
            .library()
            .toggle_watchlist(&user_id, &payload.movie_id)
            .await?,
    )))
}

/// GET /users/me/history
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<HistoryEntry>>>, ApiError> {
    let user_id = session_user_id(&session).await?;
    Ok(Json(ApiResponse::success(
        state.library().history(&user_id).await?,
    )))
}

/// POST /users/me/history
pub async fn record_watch(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<MovieRef>,
) -> Result<Json<ApiResponse<Vec<HistoryEntry>>>, ApiError> {
    let user_id = session_user_id(&session).await?;
    Ok(Json(ApiResponse::success(
        state
            .library()
            .record_watch(&user_id, &payload.movie_id)
            .await?,
    )))
}

/// PUT /users/me/preferences
/// Shallow-merges the body into stored preferences.
pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(patch): Json<Preferences>,
) -> Result<Json<ApiResponse<Preferences>>, ApiError> {
    let user_id = session_user_id(&session).await?;
    Ok(Json(ApiResponse::success(
        state.library().update_preferences(&user_id, patch).await?,
    )))
}

/// PUT /users/me/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<ProfileUpdateRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user_id = session_user_id(&session).await?;
    Ok(Json(ApiResponse::success(
        state
            .library()
            .update_profile(&user_id, &payload.display_name)
            .await?,
    )))
}
