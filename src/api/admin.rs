use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::config::Config;
use crate::models::movie::{Movie, MovieInput};
use crate::models::user::{Role, User};
use crate::services::{OverviewStats, Upload};

#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

#[derive(Serialize)]
pub struct RebuildResponse {
    pub genres: usize,
}

/// Multipart payload for movie create/update: a `metadata` part holding the
/// JSON-encoded movie fields, plus optional `poster` and `video` file parts.
struct MoviePayload {
    input: MovieInput,
    poster: Option<Upload>,
    video: Option<Upload>,
}

async fn parse_movie_multipart(mut multipart: Multipart) -> Result<MoviePayload, ApiError> {
    let mut input: Option<MovieInput> = None;
    let mut poster = None;
    let mut video = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "metadata" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("Unreadable metadata: {e}")))?;
                input = Some(
                    serde_json::from_str(&text)
                        .map_err(|e| ApiError::validation(format!("Invalid metadata: {e}")))?,
                );
            }
            "poster" | "video" => {
                let filename = field.file_name().unwrap_or("upload.bin").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(format!("Unreadable file part: {e}")))?
                    .to_vec();
                let upload = Upload { filename, data };
                if name == "poster" {
                    poster = Some(upload);
                } else {
                    video = Some(upload);
                }
            }
            other => {
                warn!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    let input = input.ok_or_else(|| ApiError::validation("Missing metadata field"))?;
    Ok(MoviePayload {
        input,
        poster,
        video,
    })
}

/// POST /movies (multipart)
pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<Movie>>, ApiError> {
    let payload = parse_movie_multipart(multipart).await?;
    let movie = state
        .content()
        .create_movie(payload.input, payload.poster, payload.video)
        .await?;
    Ok(Json(ApiResponse::success(movie)))
}

/// PUT /movies/{id} (multipart)
pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<Movie>>, ApiError> {
    let payload = parse_movie_multipart(multipart).await?;
    let movie = state
        .content()
        .update_movie(&id, payload.input, payload.poster, payload.video)
        .await?;
    Ok(Json(ApiResponse::success(movie)))
}

/// DELETE /movies/{id}
pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.content().delete_movie(&id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Movie deleted",
    ))))
}

/// GET /admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    Ok(Json(ApiResponse::success(state.content().list_users().await?)))
}

/// PUT /admin/users/{id}/role
pub async fn set_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<RoleRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.content().set_role(&id, payload.role).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Role updated",
    ))))
}

/// GET /admin/overview
pub async fn overview(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<OverviewStats>>, ApiError> {
    Ok(Json(ApiResponse::success(state.content().overview().await?)))
}

/// GET /admin/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Config>>, ApiError> {
    Ok(Json(ApiResponse::success(state.shared.config().await)))
}

/// PUT /admin/settings
/// Swaps the running config and persists it. Database and storage paths take
/// effect on restart.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(new_config): Json<Config>,
) -> Result<Json<ApiResponse<Config>>, ApiError> {
    new_config
        .validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    if let Err(e) = new_config.save_to_path(std::path::Path::new("config.toml")) {
        warn!("Failed to persist config: {e}");
    }

    *state.shared.config.write().await = new_config.clone();
    Ok(Json(ApiResponse::success(new_config)))
}

/// POST /admin/collections/rebuild
pub async fn rebuild_collections(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<RebuildResponse>>, ApiError> {
    let genres = state.content().rebuild_genre_collections().await?;
    Ok(Json(ApiResponse::success(RebuildResponse { genres })))
}
