mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use common::{PASSWORD, spawn_app, spawn_app_customized, spawn_app_with, test_config};
use estateflow::auth::revocation::InMemoryRevocationStore;
use estateflow::config::RevocationBackend;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn login_sets_http_only_cookie_and_returns_user() {
    let app = spawn_app().await;
    app.seed_user("Alice", "Alice@Example.com", "admin").await;

    let response = app.try_login("alice@example.com", PASSWORD).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["user"]["email"], "alice@example.com");
    assert!(response.body["data"]["user"].get("password_hash").is_none());

    let cookie = response
        .headers
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("Set-Cookie header");
    let token = response.body["data"]["token"].as_str().expect("token");
    assert!(cookie.starts_with(&format!("token={}", token)));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn second_login_revokes_first_session() {
    let app = spawn_app().await;
    app.seed_user("Alice", "alice@example.com", "admin").await;

    let first = app.login("alice@example.com").await;
    let second = app.login("alice@example.com").await;
    assert_ne!(first, second);

    let stale = app.get("/auth/me", &first).await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);
    assert_eq!(stale.error_type(), Some("token_revoked"));

    let current = app.get("/auth/me", &second).await;
    assert_eq!(current.status, StatusCode::OK);
    assert_eq!(current.body["data"]["email"], "alice@example.com");
}

#[tokio::test]
async fn logout_clears_cookie_and_ends_session() {
    let app = spawn_app().await;
    app.seed_user("Alice", "alice@example.com", "admin").await;
    let token = app.login("alice@example.com").await;

    let response = app
        .request(Method::POST, "/auth/logout", Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let cookie = response
        .headers
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("Set-Cookie header");
    assert!(cookie.contains("Max-Age=0"));

    let after = app.get("/auth/me", &token).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(after.error_type(), Some("token_revoked"));
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let app = spawn_app().await;

    let response = app.request(Method::GET, "/auth/me", None, None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_type(), Some("no_token"));
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let app = spawn_app().await;

    let response = app.get("/api/projects", "not-a-jwt").await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_email_and_wrong_password_look_the_same() {
    let app = spawn_app().await;
    app.seed_user("Alice", "alice@example.com", "admin").await;

    let unknown = app.try_login("nobody@example.com", PASSWORD).await;
    let wrong = app.try_login("alice@example.com", "not-the-password").await;

    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.error_type(), Some("invalid_credentials"));
    assert_eq!(wrong.error_type(), Some("invalid_credentials"));
    assert_eq!(unknown.body["message"], wrong.body["message"]);
}

#[tokio::test]
async fn deactivated_user_loses_session_and_cannot_log_in() {
    let app = spawn_app().await;
    app.seed_user("Admin", "admin@example.com", "admin").await;
    let worker = app.seed_user("Carl", "carl@example.com", "contractor").await;

    let admin = app.login("admin@example.com").await;
    let carl = app.login("carl@example.com").await;

    let response = app
        .patch(
            &format!("/api/users/{}/status", worker.id),
            &admin,
            json!({ "status": "inactive" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "inactive");

    let stale = app.get("/auth/me", &carl).await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);

    let login = app.try_login("carl@example.com", PASSWORD).await;
    assert_eq!(login.status, StatusCode::FORBIDDEN);
    assert_eq!(login.error_type(), Some("account_inactive"));
}

#[tokio::test]
async fn bearer_header_is_accepted_without_cookie() {
    let app = spawn_app().await;
    app.seed_user("Alice", "alice@example.com", "admin").await;
    let token = app.login("alice@example.com").await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn role_of_current_user_is_resolved() {
    let app = spawn_app().await;
    app.seed_user("Carl", "carl@example.com", "Contractor").await;
    let token = app.login("carl@example.com").await;

    let response = app.get("/auth/getRoleByUser", &token).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["name"], "contractor");
    assert!(response.body["data"]["permissions"].is_array());
}

#[tokio::test]
async fn health_reports_database_reachable() {
    let app = spawn_app().await;

    let response = app.request(Method::GET, "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn logout_revokes_through_injected_store() {
    let store = Arc::new(InMemoryRevocationStore::new());
    let app = spawn_app_customized(test_config(), {
        let store = store.clone();
        move |state| state.with_revocation_store(store)
    })
    .await;
    app.seed_user("Alice", "alice@example.com", "admin").await;
    let token = app.login("alice@example.com").await;
    assert!(store.is_empty().await);

    app.request(Method::POST, "/auth/logout", Some(&token), None)
        .await;

    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn database_revocation_backend_rejects_superseded_token() {
    let mut config = test_config();
    config.revocation_backend = RevocationBackend::Database;
    let app = spawn_app_with(config).await;
    app.seed_user("Alice", "alice@example.com", "admin").await;

    let first = app.login("alice@example.com").await;
    let _second = app.login("alice@example.com").await;

    let stale = app.get("/auth/me", &first).await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);
    assert_eq!(stale.error_type(), Some("token_revoked"));
}
