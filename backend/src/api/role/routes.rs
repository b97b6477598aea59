//! Defines the HTTP routes for role management.
//!
//! Listing roles and reading a role's permissions only needs a session;
//! changes require the matching `roles` permission.

use super::handlers::*;
use crate::auth::guard::modules;
use crate::auth::middleware::{RequiredPermission, require_permission, session_auth};
use crate::database::models::PermissionAction;
use crate::state::AppState;
use axum::{
    Router, middleware,
    routing::{delete, get, patch, post, put},
};

const CAN_READ: RequiredPermission = RequiredPermission::new(modules::ROLES, PermissionAction::Read);
const CAN_WRITE: RequiredPermission =
    RequiredPermission::new(modules::ROLES, PermissionAction::Write);
const CAN_EDIT: RequiredPermission = RequiredPermission::new(modules::ROLES, PermissionAction::Edit);
const CAN_DELETE: RequiredPermission =
    RequiredPermission::new(modules::ROLES, PermissionAction::Delete);

pub fn role_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_roles))
        .route(
            "/",
            post(create_role).layer(middleware::from_fn_with_state(CAN_WRITE, require_permission)),
        )
        .route(
            "/permissions",
            put(upsert_role_permissions)
                .layer(middleware::from_fn_with_state(CAN_WRITE, require_permission)),
        )
        .route("/permissions/{name}", get(get_permissions_by_role_name))
        .route(
            "/with-user-count",
            get(get_roles_with_user_count)
                .layer(middleware::from_fn_with_state(CAN_READ, require_permission)),
        )
        .route(
            "/{id}",
            patch(update_role).layer(middleware::from_fn_with_state(CAN_EDIT, require_permission)),
        )
        .route(
            "/{id}",
            delete(delete_role)
                .layer(middleware::from_fn_with_state(CAN_DELETE, require_permission)),
        )
        .route(
            "/{id}/clear-meta",
            post(clear_role_meta)
                .layer(middleware::from_fn_with_state(CAN_EDIT, require_permission)),
        )
        .route(
            "/{id}/reset-permissions",
            post(reset_role_permissions)
                .layer(middleware::from_fn_with_state(CAN_EDIT, require_permission)),
        )
        .layer(middleware::from_fn_with_state(state, session_auth))
}
