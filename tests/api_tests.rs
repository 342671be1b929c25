use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use cinearr::config::Config;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

/// Admin account seeded by migration (must match m20260301_create_catalog.rs)
const ADMIN_EMAIL: &str = "admin@cinearr.local";
const ADMIN_PASSWORD: &str = "changeme";

const BOUNDARY: &str = "cinearr-test-boundary";

async fn spawn_app() -> (Router, TempDir) {
    let assets_dir = TempDir::new().expect("Failed to create temp assets dir");

    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.storage.assets_path = assets_dir.path().to_string_lossy().to_string();
    config.server.secure_cookies = false;
    config.observability.metrics_enabled = false;

    let state = cinearr::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    (cinearr::api::router(state).await, assets_dir)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn session_cookie(response: &axum::response::Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "email": email, "password": password }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK, "login failed for {email}");
    session_cookie(&response).expect("login did not set a session cookie")
}

/// Multipart body with a JSON `metadata` part and optional `poster` file part.
fn movie_multipart(metadata: &serde_json::Value, poster: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"metadata\"\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );
    if let Some((filename, data)) = poster {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"poster\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn create_movie(
    app: &Router,
    cookie: &str,
    metadata: serde_json::Value,
    poster: Option<(&str, &[u8])>,
) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/movies")
                .header(header::COOKIE, cookie)
                .header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(movie_multipart(&metadata, poster)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    json["data"].clone()
}

#[tokio::test]
async fn test_signup_creates_signed_in_user() {
    let (app, _assets) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/signup")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "email": "a@b.com", "password": "secret1" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).expect("signup should sign the user in");
    let json = body_json(response).await;

    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["email"], "a@b.com");
    assert_eq!(json["data"]["role"], "user");
    assert_eq!(json["data"]["watchlist"], serde_json::json!([]));
    assert!(json["data"].get("password_hash").is_none());

    // The session from signup is immediately usable.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["email"], "a@b.com");
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let (app, _assets) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "email": ADMIN_EMAIL, "password": "wrong" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&response).is_none());

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let (app, _assets) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users/me/watchlist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Admin routes reject non-admin sessions outright.
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/signup")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "email": "pleb@b.com", "password": "secret1" })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    let cookie = login(&app, "pleb@b.com", "secret1").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/admin/users")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_catalog_pagination() {
    let (app, _assets) = spawn_app().await;
    let cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    for title in ["Alien", "Blade Runner", "Casablanca"] {
        create_movie(
            &app,
            &cookie,
            serde_json::json!({ "title": title, "genre": "Drama" }),
            None,
        )
        .await;
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/movies?sort=title&direction=asc&limit=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    let movies = json["data"]["movies"].as_array().unwrap();
    assert_eq!(movies.len(), 2);
    assert_eq!(movies[0]["title"], "Alien");
    assert_eq!(movies[1]["title"], "Blade Runner");
    assert_eq!(json["data"]["has_more"], true);
    let cursor = json["data"]["next_cursor"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/api/movies?sort=title&direction=asc&limit=2&cursor={cursor}"
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response).await;

    let movies = json["data"]["movies"].as_array().unwrap();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0]["title"], "Casablanca");
    assert_eq!(json["data"]["has_more"], false);
    assert!(json["data"]["next_cursor"].is_null());
}

#[tokio::test]
async fn test_watchlist_toggle_round_trip() {
    let (app, _assets) = spawn_app().await;
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let movie = create_movie(
        &app,
        &admin_cookie,
        serde_json::json!({ "title": "Heat" }),
        None,
    )
    .await;
    let movie_id = movie["id"].as_str().unwrap().to_string();

    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/signup")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "email": "viewer@b.com", "password": "secret1" })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    let cookie = login(&app, "viewer@b.com", "secret1").await;

    let toggle = |cookie: String, movie_id: String| {
        let app = app.clone();
        async move {
            let response = app
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/api/users/me/watchlist")
                        .header(header::COOKIE, &cookie)
                        .header("Content-Type", "application/json")
                        .body(Body::from(
                            serde_json::json!({ "movie_id": movie_id }).to_string(),
                        ))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            body_json(response).await
        }
    };

    let json = toggle(cookie.clone(), movie_id.clone()).await;
    let entries = json["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["movie_id"], movie_id.as_str());
    assert_eq!(entries[0]["title"], "Heat");

    // Toggling again removes the entry.
    let json = toggle(cookie.clone(), movie_id).await;
    assert_eq!(json["data"], serde_json::json!([]));
}

#[tokio::test]
async fn test_delete_movie_removes_owned_poster() {
    let (app, assets) = spawn_app().await;
    let cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let movie = create_movie(
        &app,
        &cookie,
        serde_json::json!({ "title": "Uploaded" }),
        Some(("cover.jpg", b"jpegdata")),
    )
    .await;
    let movie_id = movie["id"].as_str().unwrap().to_string();
    let poster_key = movie["poster"].as_str().unwrap().to_string();
    assert!(poster_key.starts_with("posters/"));

    let poster_path = assets.path().join(&poster_key);
    assert!(poster_path.exists());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/movies/{movie_id}"))
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(!poster_path.exists());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/movies/{movie_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_movie_leaves_external_poster_alone() {
    let (app, _assets) = spawn_app().await;
    let cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let movie = create_movie(
        &app,
        &cookie,
        serde_json::json!({
            "title": "Linked",
            "poster": "https://example.com/linked.jpg"
        }),
        None,
    )
    .await;
    let movie_id = movie["id"].as_str().unwrap().to_string();
    assert_eq!(movie["poster"], "https://example.com/linked.jpg");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/movies/{movie_id}"))
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_api_path_returns_json_envelope() {
    let (app, _assets) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/no/such/thing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Not found");
}
