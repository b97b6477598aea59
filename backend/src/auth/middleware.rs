//! Middleware for protecting authenticated routes and handling authorization.
//!
//! `session_auth` resolves the session token to a [`SessionUser`] and stores
//! it in the request extensions. `require_role` and `require_permission` must
//! be layered inside it and read that principal back.

use crate::api::common::{HttpError, service_error_to_http};
use crate::auth::errors::AuthError;
use crate::auth::guard::{authorize_permission, authorize_role};
use crate::auth::models::SessionUser;
use crate::auth::service::AuthService;
use crate::database::models::PermissionAction;
use crate::state::AppState;
use crate::utils::cookie;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Session authentication middleware
pub async fn session_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let token = cookie::session_token(request.headers());

    let session = AuthService::new(&state)
        .verify_session(token.as_deref())
        .await
        .map_err(|e| {
            tracing::debug!("Session rejected on {}: {}", request.uri().path(), e);
            service_error_to_http(e)
        })?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Role allow-list attached to a route.
#[derive(Debug, Clone, Copy)]
pub struct AllowedRoles(pub &'static [&'static str]);

/// Role authorization middleware
pub async fn require_role(
    State(AllowedRoles(allowed)): State<AllowedRoles>,
    request: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let session = current_session(&request)?;

    authorize_role(allowed, session).map_err(|e| {
        tracing::warn!(
            "Role {} not allowed on {}",
            session.role_name(),
            request.uri().path()
        );
        service_error_to_http(e)
    })?;

    Ok(next.run(request).await)
}

/// Module/action pair attached to a route.
#[derive(Debug, Clone, Copy)]
pub struct RequiredPermission {
    pub module: &'static str,
    pub action: PermissionAction,
}

impl RequiredPermission {
    pub const fn new(module: &'static str, action: PermissionAction) -> Self {
        Self { module, action }
    }
}

/// Permission authorization middleware
pub async fn require_permission(
    State(required): State<RequiredPermission>,
    request: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let session = current_session(&request)?;

    authorize_permission(required.module, required.action, session).map_err(|e| {
        tracing::warn!(
            "Permission {} on {} denied for user {} ({})",
            required.action,
            required.module,
            session.id(),
            session.role_name()
        );
        service_error_to_http(e)
    })?;

    Ok(next.run(request).await)
}

fn current_session(request: &Request) -> Result<&SessionUser, HttpError> {
    request
        .extensions()
        .get::<SessionUser>()
        .ok_or_else(|| service_error_to_http(AuthError::NoToken.into()))
}
