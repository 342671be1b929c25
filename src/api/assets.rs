use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use std::sync::Arc;
use tower_http::services::ServeFile;

use super::{ApiError, AppState};

/// GET /assets/{token}
/// Serves the file behind a previously issued download token. The token is
/// the only credential; expiry is enforced by the store. Range requests are
/// honored so video elements can seek.
pub async fn download_asset(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let path = state.assets().resolve_token(&token).await?;

    let range_header = headers
        .get("range")
        .cloned()
        .unwrap_or_else(|| axum::http::HeaderValue::from_static("bytes=0-"));

    let req = axum::http::Request::builder()
        .header("range", range_header)
        .body(axum::body::Body::empty())
        .map_err(|e| ApiError::internal(format!("Failed to build request: {e}")))?;

    match ServeFile::new(path).try_call(req).await {
        Ok(res) => Ok(res),
        Err(e) => Err(ApiError::internal(format!("Streaming error: {e}"))),
    }
}
