//! API service routes

use axum::{
    Router,
    extract::multipart::{Field, MultipartError},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    routing::get,
};
use axum_extra::{TypedHeader, headers::UserAgent};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use auth::{AuthState, rate_limiter::{client_ip, rate_limited}};

use common::error::{ApiError, ApiResult};

use crate::{models::AccessInfo, state::AppState};

mod admin;
mod albums;
mod feedback;
mod health;
mod photos;
mod public;

/// Local development frontends, always allowed alongside `FRONTEND_URL`
const DEV_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:3000"];

/// Create the router for the whole HTTP surface under `/api`
pub fn create_router(state: AppState, auth_state: AuthState) -> anyhow::Result<Router> {
    let cors = cors_layer(&state.config.frontend.url);

    let limited_routes = rate_limited(
        Router::new()
            .merge(albums::routes(&state))
            .merge(photos::routes(&state))
            .merge(public::routes())
            .merge(feedback::routes(&state))
            .merge(admin::routes(&state))
            .with_state(state.clone())
            .merge(auth::routes::create_router(auth_state)?),
        state.rate_limit,
    )?;

    let api = Router::new()
        .route("/health", get(health::health_check))
        .with_state(state)
        .merge(limited_routes);

    Ok(Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors))
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origins: Vec<HeaderValue> = DEV_ORIGINS
        .iter()
        .copied()
        .chain(std::iter::once(frontend_url))
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Requester details for the access log
fn access_info(
    headers: &HeaderMap,
    peer: Option<std::net::SocketAddr>,
    user_agent: Option<TypedHeader<UserAgent>>,
) -> AccessInfo {
    AccessInfo {
        ip_address: client_ip(headers, peer),
        user_agent: user_agent
            .map(|TypedHeader(agent)| agent.to_string())
            .unwrap_or_default(),
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    warn!("Rejected multipart body: {}", err.body_text());
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Request body too large".to_string())
    } else {
        ApiError::Validation("Invalid multipart body".to_string())
    }
}

/// Read one multipart file, failing as soon as it exceeds `max_size` bytes
async fn read_field(mut field: Field<'_>, max_size: u64) -> ApiResult<Vec<u8>> {
    let mut data = Vec::new();

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if (data.len() + chunk.len()) as u64 > max_size {
            return Err(ApiError::PayloadTooLarge(format!(
                "File too large, the maximum is {} MB",
                max_size / (1024 * 1024)
            )));
        }
        data.extend_from_slice(&chunk);
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use anyhow::bail;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        extract::ConnectInfo,
        http::Request,
    };
    use chrono::Utc;
    use serde_json::Value;
    use sqlx::{PgPool, postgres::PgPoolOptions};
    use tower::ServiceExt;

    use auth::{
        FeedbackMail, JwtService, Mailer,
        models::{Role, User},
        rate_limiter::RateLimiterConfig,
        repositories::UserRepository,
    };
    use common::{config::AppConfig, database::run_migrations};

    use super::*;
    use crate::lifecycle::AlbumLifecycle;
    use crate::lifecycle::testing::{FakeThumbnailer, MemoryStore, RecordingStorage};
    use crate::models::AccessAction;
    use crate::repositories::{AccessLogRepository, AdminRepository, AlbumRepository, fixtures};

    /// Mailer that keeps feedback in memory and can be told to fail
    #[derive(Default)]
    struct RecordingMailer {
        feedback: Mutex<Vec<FeedbackMail>>,
        fail: AtomicBool,
    }

    impl RecordingMailer {
        fn feedback(&self) -> Vec<FeedbackMail> {
            self.feedback.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        fn is_configured(&self) -> bool {
            true
        }

        async fn send_verification(&self, _to: &str, _token: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn send_password_reset(&self, _to: &str, _token: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn send_feedback(&self, feedback: &FeedbackMail) -> anyhow::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                bail!("smtp relay refused the message");
            }
            self.feedback.lock().unwrap().push(feedback.clone());
            Ok(())
        }
    }

    struct TestApp {
        router: Router,
        store: Arc<MemoryStore>,
        storage: Arc<RecordingStorage>,
        mailer: Arc<RecordingMailer>,
        jwt: JwtService,
        pool: PgPool,
    }

    fn test_app() -> TestApp {
        let config = AppConfig::from_env().unwrap();
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy(&config.database.database_url)
            .unwrap();

        let store = Arc::new(MemoryStore::default());
        let storage = Arc::new(RecordingStorage::default());
        let lifecycle = AlbumLifecycle::new(
            store.clone(),
            storage.clone(),
            Arc::new(FakeThumbnailer),
            config.upload.clone(),
            "https://pic.example",
        );
        let jwt = JwtService::new(&config.jwt);
        let mailer = Arc::new(RecordingMailer::default());

        let auth_state = AuthState {
            user_repository: UserRepository::new(pool.clone()),
            jwt_service: jwt.clone(),
            mailer: mailer.clone(),
            rate_limit: RateLimiterConfig::auth(),
        };
        let state = AppState {
            db_pool: pool.clone(),
            config: Arc::new(config),
            lifecycle,
            album_repository: AlbumRepository::new(pool.clone()),
            admin_repository: AdminRepository::new(pool.clone()),
            access_log_repository: AccessLogRepository::new(pool.clone()),
            storage: storage.clone(),
            mailer: mailer.clone(),
            jwt_service: jwt.clone(),
            rate_limit: RateLimiterConfig::api(),
        };

        TestApp {
            router: create_router(state, auth_state).unwrap(),
            store,
            storage,
            mailer,
            jwt,
            pool,
        }
    }

    fn bearer_for(jwt: &JwtService, id: i64, role: Role) -> String {
        jwt.generate_token(&User {
            id,
            email: format!("user{}@example.com", id),
            password_hash: String::new(),
            name: format!("User {}", id),
            role,
            email_verified: true,
            avatar_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .unwrap()
    }

    async fn send(app: &TestApp, mut request: Request<Body>) -> (StatusCode, Value) {
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
        let response = app.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn authed(method: &str, uri: &str, token: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token))
    }

    async fn create_album(app: &TestApp, token: &str) -> Value {
        let request = authed("POST", "/api/albums", token)
            .header("content-type", "application/json")
            .body(Body::from(r#"{"title":"Wedding","expiresInHours":2}"#))
            .unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        body["album"].clone()
    }

    /// Multipart body; parts with an empty file name are plain text fields
    fn multipart(parts: &[(&str, &str, &str, &[u8])]) -> (String, Vec<u8>) {
        let boundary = "picshare-test-boundary";
        let mut body = Vec::new();
        for (field, file_name, content_type, data) in parts {
            let header = if file_name.is_empty() {
                format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n")
            } else {
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
            };
            body.extend_from_slice(header.as_bytes());
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={boundary}"), body)
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_health_is_public() {
        let app = test_app();
        let request = Request::get("/api/health").body(Body::empty()).unwrap();

        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].is_string());
        assert!(body["database"].is_string());
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_album_routes_require_token() {
        let app = test_app();
        let request = Request::get("/api/albums").body(Body::empty()).unwrap();

        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_admin_routes_reject_photographers() {
        let app = test_app();
        let token = bearer_for(&app.jwt, 1, Role::Photographer);
        let request = authed("GET", "/api/admin/stats", &token)
            .body(Body::empty())
            .unwrap();

        let (status, _) = send(&app, request).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_create_and_list_albums() {
        let app = test_app();
        let token = bearer_for(&app.jwt, 1, Role::Photographer);

        let album = create_album(&app, &token).await;
        assert_eq!(album["title"], "Wedding");
        assert_eq!(album["isExpired"], false);

        let request = authed("GET", "/api/albums?page=1&limit=500", &token)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["albums"].as_array().unwrap().len(), 1);
        assert_eq!(body["pagination"]["limit"], 20);
        assert_eq!(body["pagination"]["totalPages"], 1);
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_qr_code_endpoint() {
        let app = test_app();
        let token = bearer_for(&app.jwt, 1, Role::Photographer);
        let album = create_album(&app, &token).await;

        let uri = format!("/api/albums/{}/qrcode", album["id"]);
        let (status, body) = send(&app, authed("GET", &uri, &token).body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["qrCode"].as_str().unwrap().starts_with("data:image/png;base64,"));
        assert_eq!(body["shareUrl"], album["shareUrl"]);

        // Someone else's album is invisible
        let other = bearer_for(&app.jwt, 2, Role::Photographer);
        let (status, _) = send(&app, authed("GET", &uri, &other).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_photo_upload() {
        let app = test_app();
        let token = bearer_for(&app.jwt, 1, Role::Photographer);
        let album = create_album(&app, &token).await;
        let uri = format!("/api/albums/{}/photos", album["id"]);

        let (content_type, body) = multipart(&[("photos", "notes.txt", "text/plain", b"hello")]);
        let request = authed("POST", &uri, &token)
            .header("content-type", content_type)
            .body(Body::from(body))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (content_type, body) = multipart(&[
            ("photos", "a.jpg", "image/jpeg", b"image"),
            ("photos", "b.png", "image/png", b"corrupt"),
        ]);
        let request = authed("POST", &uri, &token)
            .header("content-type", content_type)
            .body(Body::from(body))
            .unwrap();
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["photos"].as_array().unwrap().len(), 1);
        assert_eq!(body["failed"], 1);
        assert!(body["photos"][0].get("storageKey").is_none());
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_shared_album_lifecycle_over_http() {
        let app = test_app();
        let token = bearer_for(&app.jwt, 1, Role::Photographer);
        let album = create_album(&app, &token).await;
        let uri = format!("/api/s/{}", album["shareCode"].as_str().unwrap());

        let (status, body) = send(&app, Request::get(&uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["album"]["title"], "Wedding");
        assert!(body["album"].get("shareCode").is_none());

        let id = album["id"].as_i64().unwrap();
        app.store
            .set_expiry(id, Utc::now() - chrono::Duration::seconds(1), false);
        let (status, body) = send(&app, Request::get(&uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::GONE);
        assert!(body["error"].is_string());

        let (status, _) = send(
            &app,
            Request::get("/api/s/0000000000000000").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    async fn post_feedback(
        app: &TestApp,
        token: Option<&str>,
        parts: &[(&str, &str, &str, &[u8])],
    ) -> (StatusCode, Value) {
        let (content_type, body) = multipart(parts);
        let mut builder = Request::post("/api/feedback").header("content-type", content_type);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        send(app, builder.body(Body::from(body)).unwrap()).await
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_feedback_text_bounds() {
        let app = test_app();
        let long_content = "a".repeat(501);
        let long_contact = "c".repeat(101);

        for parts in [
            vec![("content", "", "", b"  hey  ".as_slice())],
            vec![("content", "", "", long_content.as_bytes())],
            vec![
                ("content", "", "", b"Lovely app".as_slice()),
                ("contact", "", "", long_contact.as_bytes()),
            ],
        ] {
            let (status, body) = post_feedback(&app, None, &parts).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].is_string());
        }
        assert!(app.mailer.feedback().is_empty());

        let content = "a".repeat(500);
        let contact = "c".repeat(100);
        let (status, body) = post_feedback(
            &app,
            None,
            &[
                ("content", "", "", content.as_bytes()),
                ("contact", "", "", contact.as_bytes()),
            ],
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());
        let mails = app.mailer.feedback();
        assert_eq!(mails.len(), 1);
        assert_eq!(mails[0].user_name, "Anonymous");
        assert_eq!(mails[0].content, content);
        assert_eq!(mails[0].contact, contact);
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_feedback_rejects_non_image_attachment() {
        let app = test_app();

        let (status, _) = post_feedback(
            &app,
            None,
            &[
                ("content", "", "", b"Upload button is broken".as_slice()),
                ("images", "notes.pdf", "application/pdf", b"%PDF".as_slice()),
            ],
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(app.storage.stored().is_empty());
        assert!(app.mailer.feedback().is_empty());
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_feedback_keeps_first_five_images() {
        let app = test_app();
        let token = bearer_for(&app.jwt, 1, Role::Photographer);
        let mut parts = vec![("content", "", "", b"Screenshots attached".as_slice())];
        for _ in 0..6 {
            parts.push(("images", "shot.png", "image/png", b"png".as_slice()));
        }

        let (status, _) = post_feedback(&app, Some(&token), &parts).await;

        assert_eq!(status, StatusCode::OK);
        let stored = app.storage.stored();
        assert_eq!(stored.len(), 5);
        assert!(stored.iter().all(|key| key.starts_with("feedback/") && key.ends_with(".png")));
        let mails = app.mailer.feedback();
        assert_eq!(mails[0].image_urls.len(), 5);
        assert_eq!(mails[0].user_name, "User 1");
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_feedback_succeeds_when_mail_fails() {
        let app = test_app();
        app.mailer.fail.store(true, Ordering::SeqCst);

        let (status, body) = post_feedback(
            &app,
            None,
            &[("content", "", "", b"Please add albums for video".as_slice())],
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());
        assert!(app.mailer.feedback().is_empty());
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_malformed_multipart_hides_parser_detail() {
        let app = test_app();
        let request = Request::post("/api/feedback")
            .header("content-type", "multipart/form-data; boundary=picshare-test-boundary")
            .body(Body::from("this is not a multipart body"))
            .unwrap();

        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid multipart body");
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_admin_deletes_any_album() {
        let app = test_app();
        let owner = bearer_for(&app.jwt, 1, Role::Photographer);
        let admin = bearer_for(&app.jwt, 99, Role::Admin);
        let album = create_album(&app, &owner).await;
        let id = album["id"].as_i64().unwrap();

        let (content_type, body) = multipart(&[("photos", "a.jpg", "image/jpeg", b"image")]);
        let request = authed("POST", &format!("/api/albums/{}/photos", id), &owner)
            .header("content-type", content_type)
            .body(Body::from(body))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);

        let uri = format!("/api/admin/albums/{}", id);
        let (status, _) = send(&app, authed("DELETE", &uri, &owner).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, authed("DELETE", &uri, &admin).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());
        assert!(app.store.album(id).is_none());
        assert!(app.store.photos(id).is_empty());
        assert_eq!(app.storage.deleted().len(), 2);

        let (status, _) = send(&app, authed("DELETE", &uri, &admin).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    /// Needs a reachable PostgreSQL instance (`DATABASE_URL`)
    #[tokio::test]
    #[ignore]
    #[serial_test::serial]
    async fn test_admin_dashboard_over_database() {
        let app = test_app();
        run_migrations(&app.pool).await.unwrap();
        let admin = bearer_for(&app.jwt, 99, Role::Admin);
        let owner = fixtures::user(&app.pool, Role::Photographer).await;
        let active = fixtures::album(&app.pool, owner.id, Utc::now() + chrono::Duration::hours(2)).await;
        let expired = fixtures::album(&app.pool, owner.id, Utc::now() - chrono::Duration::hours(1)).await;
        AccessLogRepository::new(app.pool.clone())
            .record(active.id, AccessAction::View, None, &AccessInfo::default())
            .await
            .unwrap();

        let get = |uri: String| authed("GET", &uri, &admin).body(Body::empty()).unwrap();

        let (status, body) = send(&app, get("/api/admin/stats".to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["stats"]["totalAlbums"].as_i64().unwrap() >= 2);
        assert!(body["stats"]["activeAlbums"].as_i64().unwrap() >= 1);

        let (status, body) = send(&app, get("/api/admin/users?limit=100".to_string())).await;
        assert_eq!(status, StatusCode::OK);
        let user = body["users"]
            .as_array()
            .unwrap()
            .iter()
            .find(|user| user["id"] == owner.id)
            .unwrap();
        assert_eq!(user["albumCount"], 2);

        let uri = format!("/api/admin/users/{}/albums", owner.id);
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pagination"]["total"], 2);

        for (status_filter, expect_expired, present, absent) in [
            ("active", false, active.id, expired.id),
            ("expired", true, expired.id, active.id),
        ] {
            let uri = format!("/api/admin/albums?status={}&limit=100", status_filter);
            let (status, body) = send(&app, get(uri)).await;
            assert_eq!(status, StatusCode::OK);

            let albums = body["albums"].as_array().unwrap();
            assert!(albums.iter().all(|album| album["isExpired"] == expect_expired));
            assert!(albums.iter().any(|album| album["id"] == present));
            assert!(albums.iter().all(|album| album["id"] != absent));
            let seeded = albums.iter().find(|album| album["id"] == present).unwrap();
            assert_eq!(seeded["userEmail"], owner.email.as_str());
        }

        let uri = format!("/api/admin/albums/{}/logs", active.id);
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        let logs = body["logs"].as_array().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0]["action"], "view");
    }
}
