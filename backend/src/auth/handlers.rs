//! Handler functions for authentication-related API endpoints.
//!
//! These functions parse the request, delegate to `auth::service` for the
//! session lifecycle and translate the outcome into the response envelope and
//! the `token` cookie.

use crate::api::common::{ApiResponse, HttpError, service_error_to_http};
use crate::auth::models::*;
use crate::auth::service::AuthService;
use crate::database::models::{Role, User};
use crate::errors::ServiceError;
use crate::repositories::role_repository::RoleRepository;
use crate::state::AppState;
use crate::utils::cookie;
use axum::{
    extract::{Extension, Json},
    http::{HeaderMap, HeaderValue, header},
    response::Json as ResponseJson,
};

/// Handle user login request
#[axum::debug_handler]
pub async fn login(
    Extension(state): Extension<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(HeaderMap, ResponseJson<ApiResponse<LoginResponse>>), HttpError> {
    let response = AuthService::new(&state)
        .issue_session(payload)
        .await
        .map_err(service_error_to_http)?;

    let set_cookie = cookie::session_cookie(
        &response.token,
        response.expires_in,
        state.config.production,
    );
    let headers = set_cookie_header(&set_cookie)?;

    Ok((
        headers,
        ResponseJson(ApiResponse::success(response, "Login successful")),
    ))
}

/// Handle logout request
#[axum::debug_handler]
pub async fn logout(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
) -> Result<(HeaderMap, ResponseJson<ApiResponse<()>>), HttpError> {
    AuthService::new(&state)
        .revoke_session(&session.token)
        .await
        .map_err(service_error_to_http)?;

    tracing::info!("User {} logged out", session.id());

    let headers = set_cookie_header(&cookie::cleared_session_cookie(state.config.production))?;

    Ok((
        headers,
        ResponseJson(ApiResponse::success((), "Logged out successfully")),
    ))
}

/// Get current user info (protected route)
#[axum::debug_handler]
pub async fn me(
    Extension(session): Extension<SessionUser>,
) -> Result<ResponseJson<ApiResponse<User>>, HttpError> {
    Ok(ResponseJson(ApiResponse::ok(session.user)))
}

/// Role document for the caller's role name
#[axum::debug_handler]
pub async fn get_role_by_user(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
) -> Result<ResponseJson<ApiResponse<Role>>, HttpError> {
    let role = RoleRepository::new(&state.pool)
        .get_role_by_name(session.role_name())
        .await
        .map_err(|e| service_error_to_http(e.into()))?
        .ok_or_else(|| {
            service_error_to_http(ServiceError::not_found("Role", session.role_name()))
        })?;

    Ok(ResponseJson(ApiResponse::success(
        role,
        "Role retrieved successfully",
    )))
}

fn set_cookie_header(value: &str) -> Result<HeaderMap, HttpError> {
    let value = HeaderValue::from_str(value).map_err(|e| {
        service_error_to_http(ServiceError::internal_error(format!(
            "Invalid session cookie: {}",
            e
        )))
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}
