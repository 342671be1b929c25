use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::services::{AuthService, CatalogService, ContentService, LibraryService};
use crate::state::SharedState;
use crate::storage::AssetStore;

mod admin;
mod assets;
pub mod auth;
mod error;
mod movies;
mod observability;
mod types;
mod users;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn CatalogService> {
        &self.shared.catalog_service
    }

    #[must_use]
    pub fn library(&self) -> &Arc<dyn LibraryService> {
        &self.shared.library_service
    }

    #[must_use]
    pub fn content(&self) -> &Arc<dyn ContentService> {
        &self.shared.content_service
    }

    #[must_use]
    pub fn assets(&self) -> &Arc<dyn AssetStore> {
        &self.shared.assets
    }
}

pub async fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle).await)
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (cors_origins, secure_cookies, session_minutes, max_upload) = {
        let config = state.shared.config.read().await;
        (
            config.server.cors_allowed_origins.clone(),
            config.server.secure_cookies,
            config.server.session_idle_minutes,
            config.max_upload_bytes(),
        )
    };

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            i64::try_from(session_minutes).unwrap_or(60),
        )));

    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/movies", get(movies::list_movies))
        .route("/movies/featured", get(movies::featured))
        .route("/movies/trending", get(movies::trending))
        .route("/movies/recent", get(movies::recent))
        .route("/movies/genres", get(movies::genres))
        .route("/movies/{id}", get(movies::get_movie))
        .route("/movies/{id}/similar", get(movies::similar))
        .route("/assets/{token}", get(assets::download_asset));

    let user_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/movies/{id}/view", post(movies::record_view))
        .route("/movies/{id}/download", post(movies::record_download))
        .route("/movies/{id}/rating", post(movies::rate))
        .route("/movies/{id}/play", get(movies::play))
        .route(
            "/users/me/watchlist",
            get(users::get_watchlist).post(users::toggle_watchlist),
        )
        .route(
            "/users/me/history",
            get(users::get_history).post(users::record_watch),
        )
        .route("/users/me/preferences", put(users::update_preferences))
        .route("/users/me/profile", put(users::update_profile))
        .route_layer(middleware::from_fn(auth::require_user));

    let admin_routes = Router::new()
        .route("/movies", post(admin::create_movie))
        .route("/movies/{id}", put(admin::update_movie))
        .route("/movies/{id}", delete(admin::delete_movie))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}/role", put(admin::set_role))
        .route("/admin/overview", get(admin::overview))
        .route(
            "/admin/settings",
            get(admin::get_settings).put(admin::update_settings),
        )
        .route(
            "/admin/collections/rebuild",
            post(admin::rebuild_collections),
        )
        .route("/metrics", get(observability::get_metrics))
        .layer(DefaultBodyLimit::max(
            usize::try_from(max_upload).unwrap_or(usize::MAX),
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .fallback(api_not_found)
        .layer(session_layer)
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .fallback(api_not_found)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

async fn api_not_found() -> (StatusCode, Json<ApiResponse<()>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::error("Not found")),
    )
}
