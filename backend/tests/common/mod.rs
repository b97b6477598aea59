//! Shared harness for the HTTP integration tests.
//!
//! Each test gets its own in-memory database with migrations applied and
//! drives the real router through `tower::ServiceExt::oneshot`. Tests that
//! need several pooled connections use a [`TempDatabase`] file instead.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use estateflow::config::{Config, RevocationBackend};
use estateflow::database::Database;
use estateflow::database::models::{CreateUserRequest, User};
use estateflow::services::user_service::UserService;
use estateflow::state::AppState;
use serde_json::Value;
use std::path::PathBuf;
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "password123";
pub const DEADLINE: &str = "2026-12-31T00:00:00Z";

#[derive(Clone)]
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn error_type(&self) -> Option<&str> {
        self.body["error"]["error_type"].as_str()
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        max_connections: 1,
        acquire_timeout_seconds: 5,
        jwt_secret: "integration-test-secret".to_string(),
        jwt_expires_in_seconds: 3600,
        server_port: 0,
        production: false,
        bcrypt_cost: 4,
        revocation_backend: RevocationBackend::Memory,
        review_requires_contractor_submission: false,
        email: None,
        bootstrap_admin: None,
    }
}

/// A database file in the temp directory, removed together with its WAL
/// side files when dropped.
pub struct TempDatabase {
    path: PathBuf,
}

impl TempDatabase {
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!("estateflow-test-{}.db", Uuid::now_v7()));
        Self { path }
    }

    /// Test config pointing at this file with a multi-connection pool.
    pub fn config(&self) -> Config {
        Config {
            database_url: format!("sqlite://{}", self.path.display()),
            max_connections: 8,
            ..test_config()
        }
    }
}

impl Drop for TempDatabase {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.path.display(), suffix));
        }
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    spawn_app_customized(config, |state| state).await
}

/// Like [`spawn_app_with`], with a hook to swap collaborators on the state
/// before the router is built.
pub async fn spawn_app_customized(
    config: Config,
    customize: impl FnOnce(AppState) -> AppState,
) -> TestApp {
    let db = Database::new(&config).await.expect("open database");
    db.migrate().await.expect("apply migrations");

    let state = customize(AppState::new(db.pool().clone(), config).expect("build state"));
    let router = estateflow::build_app(state.clone());

    TestApp { state, router }
}

impl TestApp {
    pub async fn seed_user(&self, name: &str, email: &str, role_name: &str) -> User {
        UserService::new(&self.state)
            .create_user(CreateUserRequest {
                name: name.to_string(),
                email: email.to_string(),
                password: PASSWORD.to_string(),
                role_name: role_name.to_string(),
                status: None,
                phone: None,
                company: None,
                specialization: None,
            })
            .await
            .expect("seed user")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("token={}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn try_login(&self, email: &str, password: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/auth/login",
            None,
            Some(serde_json::json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Logs in and returns the session token.
    pub async fn login(&self, email: &str) -> String {
        let response = self.try_login(email, PASSWORD).await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
        response.body["data"]["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }
}
