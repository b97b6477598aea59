//! Defines the HTTP routes specifically for authentication.
//!
//! Login is public. Everything else runs behind `session_auth`.

use crate::auth::handlers::*;
use crate::auth::middleware::*;
use crate::state::AppState;
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// Creates the authentication router with all auth-related routes
pub fn auth_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/getRoleByUser", get(get_role_by_user))
        .layer(middleware::from_fn_with_state(state, session_auth));

    Router::new().route("/login", post(login)).merge(protected)
}
