//! Defines the HTTP routes for user administration.
//!
//! Every route needs a session; each one additionally requires a `users`
//! permission on the caller's role.

use super::handlers::*;
use crate::auth::guard::modules;
use crate::auth::middleware::{RequiredPermission, require_permission, session_auth};
use crate::database::models::PermissionAction;
use crate::state::AppState;
use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};

const CAN_READ: RequiredPermission = RequiredPermission::new(modules::USERS, PermissionAction::Read);
const CAN_WRITE: RequiredPermission =
    RequiredPermission::new(modules::USERS, PermissionAction::Write);
const CAN_EDIT: RequiredPermission = RequiredPermission::new(modules::USERS, PermissionAction::Edit);
const CAN_DELETE: RequiredPermission =
    RequiredPermission::new(modules::USERS, PermissionAction::Delete);

pub fn user_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            post(create_user).layer(middleware::from_fn_with_state(CAN_WRITE, require_permission)),
        )
        .route(
            "/",
            get(list_users).layer(middleware::from_fn_with_state(CAN_READ, require_permission)),
        )
        .route(
            "/by-role/{role_name}",
            get(get_users_by_role)
                .layer(middleware::from_fn_with_state(CAN_READ, require_permission)),
        )
        .route(
            "/{id}",
            get(get_user_by_id).layer(middleware::from_fn_with_state(CAN_READ, require_permission)),
        )
        .route(
            "/{id}",
            patch(update_user).layer(middleware::from_fn_with_state(CAN_EDIT, require_permission)),
        )
        .route(
            "/{id}",
            delete(delete_user)
                .layer(middleware::from_fn_with_state(CAN_DELETE, require_permission)),
        )
        .route(
            "/{id}/status",
            patch(update_user_status)
                .layer(middleware::from_fn_with_state(CAN_EDIT, require_permission)),
        )
        .route(
            "/{id}/reset-password",
            post(reset_password).layer(middleware::from_fn_with_state(CAN_EDIT, require_permission)),
        )
        .layer(middleware::from_fn_with_state(state, session_auth))
}
