//! Estateflow operations backend.
//!
//! Session-authenticated REST API for role administration and the
//! construction task workflow. [`build_app`] assembles the router; the
//! binary in `main.rs` wires configuration, the database and the listener.

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod repositories;
pub mod services;
pub mod state;
pub mod utils;

use crate::api::common::{ApiResponse, HttpError, error_response};
use crate::state::AppState;
use axum::{
    Extension, Router,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use std::any::Any;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

/// Builds the full application router around `state`.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .nest("/auth", auth::routes::auth_router(state.clone()))
        .nest("/api/users", api::user::routes::user_router(state.clone()))
        .nest("/api/roles", api::role::routes::role_router(state.clone()))
        .nest(
            "/api/projects",
            api::project::routes::project_router(state.clone()),
        )
        .nest(
            "/api/notifications",
            api::notification::routes::notification_router(state.clone()),
        )
        .layer(Extension(state))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}

async fn root_handler() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        serde_json::json!({
            "service": "Estateflow Backend",
            "version": env!("CARGO_PKG_VERSION")
        }),
        "Welcome to Estateflow API",
    ))
}

async fn health_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<ApiResponse<serde_json::Value>>, HttpError> {
    sqlx::query("SELECT 1")
        .execute(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!("Health check failed: {}", e);
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Database unavailable",
                "database_error",
            )
        })?;

    Ok(Json(ApiResponse::ok(serde_json::json!({ "status": "ok" }))))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Handler panicked: {}", detail);

    let (status, body) = error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        "internal_error",
    );
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}
