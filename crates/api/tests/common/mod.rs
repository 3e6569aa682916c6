//! Shared helpers for HTTP-level integration tests.
//!
//! Every test builds the real router through [`build_app_router`] so the
//! middleware stack matches production.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use orderflow_api::auth::jwt::{generate_access_token, JwtConfig};
use orderflow_api::auth::password::hash_password;
use orderflow_api::config::ServerConfig;
use orderflow_api::router::build_app_router;
use orderflow_api::state::AppState;
use orderflow_core::roles::Role;
use orderflow_core::types::DbId;
use orderflow_db::models::user::CreateUser;
use orderflow_db::repositories::UserRepo;
use orderflow_events::EventBus;
use sqlx::PgPool;
use tower::ServiceExt;

pub const TEST_PASSWORD: &str = "test_password_123!";
pub const MULTIPART_BOUNDARY: &str = "orderflow-test-boundary";

/// Build a test `ServerConfig` with a fixed JWT secret.
pub fn test_config(media_root: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "orderflow-integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
        media_root,
        media_max_bytes: 1024 * 1024,
    }
}

/// Build the application with media written under the system temp dir.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_media(pool, &std::env::temp_dir().join("orderflow-test-media"))
}

pub fn build_test_app_with_media(pool: PgPool, media_root: &Path) -> Router {
    let config = test_config(media_root.to_path_buf());
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::new(EventBus::default()),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Seed data
// ---------------------------------------------------------------------------

/// A seeded user with a ready-to-use bearer token.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: DbId,
    pub username: String,
    pub role: Role,
    pub token: String,
}

/// Insert a user with [`TEST_PASSWORD`] and mint an access token for them.
pub async fn seed_user(pool: &PgPool, username: &str, role: Role) -> TestUser {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@test.com"),
            password_hash: hash_password(TEST_PASSWORD).expect("hashing should succeed"),
            role_id: role.id(),
        },
    )
    .await
    .expect("user creation should succeed");

    TestUser {
        id: user.id,
        username: user.username,
        role,
        token: token_for(user.id, role),
    }
}

pub fn token_for(user_id: DbId, role: Role) -> String {
    let config = test_config(PathBuf::new());
    generate_access_token(user_id, role, &config.jwt).expect("token generation should succeed")
}

/// One user per role.
pub struct Cast {
    pub admin: TestUser,
    pub maker: TestUser,
    pub client: TestUser,
}

pub async fn seed_cast(pool: &PgPool) -> Cast {
    Cast {
        admin: seed_user(pool, "admin", Role::Admin).await,
        maker: seed_user(pool, "maker", Role::Manufacturer).await,
        client: seed_user(pool, "client", Role::Client).await,
    }
}

/// Create an order (admin) for the cast's client and manufacturer, with one
/// product. Returns `(order_id, product_id)`.
pub async fn seed_order_with_product(app: &Router, cast: &Cast) -> (DbId, DbId) {
    let response = post_json_auth(
        app.clone(),
        "/api/v1/orders",
        serde_json::json!({
            "name": "Conference kit",
            "client_id": cast.client.id,
            "manufacturer_id": cast.maker.id,
            "sample_required": true,
        }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), 201, "order creation should succeed");
    let order_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/orders/{order_id}/products"),
        serde_json::json!({ "name": "Lanyard", "description": "Woven, 20mm" }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), 201, "product creation should succeed");
    let product_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    (order_id, product_id)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

fn json_request(method: Method, uri: &str, body: serde_json::Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, json_request(Method::POST, uri, body, None)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, json_request(Method::POST, uri, body, Some(token))).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, json_request(Method::PUT, uri, body, Some(token))).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// POST a multipart form. `fields` are plain text parts; `file` is
/// `(file_name, bytes)` sent as the `file` part.
pub async fn post_multipart_auth(
    app: Router,
    uri: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
    token: &str,
) -> Response<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("response body should be JSON")
}
