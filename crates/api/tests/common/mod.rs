#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use surat_api::auth::jwt::{generate_access_token, JwtConfig};
use surat_api::config::{ReminderConfig, ServerConfig, StorageConfig};
use surat_api::router::build_app_router;
use surat_api::state::AppState;
use surat_core::retry::RetryPolicy;
use surat_core::roles::{Actor, Role};
use surat_core::types::DbId;
use surat_db::models::activity::CreateActivity;
use surat_db::models::letter::CreateLetter;
use surat_db::models::user::CreateUser;
use surat_db::repositories::{ActivityRepo, LetterRepo, UserRepo};
use surat_events::EventBus;
use surat_workflow::linking::LinkRequest;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Build a test `ServerConfig` with safe defaults and a fresh storage root.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        database_url: String::new(),
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
        storage: StorageConfig {
            root: std::env::temp_dir().join(format!("surat-api-test-{}", Uuid::new_v4())),
            public_url: "http://localhost:3000/files".to_string(),
            signing_secret: "test-storage-secret".to_string(),
        },
        retry: RetryPolicy::immediate(),
        signed_url_ttl_secs: 600,
        reminders: ReminderConfig {
            horizon_days: 1,
            interval: Duration::from_secs(3600),
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub pool: PgPool,
}

impl TestApp {
    /// A fresh router over the same state (oneshot consumes the router).
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build the full application router with the production middleware stack.
pub fn build_test_app(pool: PgPool) -> TestApp {
    let config = test_config();
    let state = AppState::new(pool.clone(), config.clone(), Arc::new(EventBus::default()));
    let router = build_app_router(state.clone(), &config);
    TestApp {
        router,
        state,
        pool,
    }
}

// ---------------------------------------------------------------------------
// Seed data
// ---------------------------------------------------------------------------

pub async fn seed_user(pool: &PgPool, role: Role) -> DbId {
    let tag = Uuid::new_v4().simple().to_string();
    UserRepo::create(
        pool,
        &CreateUser {
            name: format!("User {tag}"),
            email: format!("{tag}@example.test"),
            role: role.as_str().to_string(),
        },
    )
    .await
    .expect("user creation should succeed")
    .id
}

pub async fn seed_letter(pool: &PgPool) -> DbId {
    LetterRepo::create(
        pool,
        &CreateLetter {
            letter_number: format!("005/UND/{}", &Uuid::new_v4().simple().to_string()[..6]),
            subject: "Invitation to coordination meeting".to_string(),
            sender: Some("Regional Office".to_string()),
            letter_date: None,
            direction: None,
        },
    )
    .await
    .expect("letter creation should succeed")
    .id
}

pub async fn seed_activity(pool: &PgPool) -> DbId {
    ActivityRepo::create(
        pool,
        &CreateActivity {
            title: "Coordination meeting".to_string(),
            description: None,
            scheduled_at: None,
        },
    )
    .await
    .expect("activity creation should succeed")
    .id
}

/// Seed a letter and an activity and link them through one disposition for
/// a fresh staff user. Returns `(letter, activity)`.
pub async fn seed_linked_pair(test: &TestApp) -> (DbId, DbId) {
    let letter = seed_letter(&test.pool).await;
    let activity = seed_activity(&test.pool).await;
    let supervisor = Actor::new(seed_user(&test.pool, Role::Supervisor).await, Role::Supervisor);
    let request = LinkRequest {
        assignees: vec![seed_user(&test.pool, Role::Staff).await],
        instruction_text: "Attend and report back".to_string(),
        deadline: None,
        attachments: Vec::new(),
    };
    test.state
        .links
        .link(letter, activity, request, &supervisor)
        .await
        .expect("linking should succeed");
    (letter, activity)
}

/// Bearer token for `user_id` acting as `role`.
pub fn token(user_id: DbId, role: Role) -> String {
    let config = JwtConfig {
        secret: TEST_JWT_SECRET.to_string(),
        access_token_expiry_mins: 15,
    };
    generate_access_token(user_id, role, &config).expect("token generation should succeed")
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json_auth(app: Router, uri: &str, token: &str, body: Value) -> Response {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(app: Router, uri: &str, token: &str, body: Value) -> Response {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Upload `bytes` as the `file` field of a multipart body.
pub async fn upload_auth(
    app: Router,
    uri: &str,
    token: &str,
    file_name: &str,
    bytes: &[u8],
) -> Response {
    let boundary = "surat-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Assert the status and return the JSON body.
pub async fn expect_json(response: Response, status: StatusCode) -> Value {
    let actual = response.status();
    let json = body_json(response).await;
    assert_eq!(actual, status, "unexpected status, body: {json}");
    json
}
