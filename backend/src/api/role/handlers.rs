//! Handler functions for role management API endpoints.
//!
//! Roles are addressed by id for updates and by name for permission
//! lookups and upserts.

use crate::api::common::{ApiResponse, HttpError, service_error_to_http};
use crate::database::models::{
    CreateRoleRequest, PermissionEntry, Role, RoleWithUserCount, UpdateRoleRequest,
    UpsertRolePermissionsRequest,
};
use crate::services::role_service::RoleService;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
};

/// Lists every role.
#[axum::debug_handler]
pub async fn list_roles(
    Extension(state): Extension<AppState>,
) -> Result<Json<ApiResponse<Vec<Role>>>, HttpError> {
    let roles = RoleService::new(&state.pool)
        .list_roles()
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        roles,
        "Roles retrieved successfully",
    )))
}

/// Creates a role. Names are unique ignoring case.
#[axum::debug_handler]
pub async fn create_role(
    Extension(state): Extension<AppState>,
    Json(payload): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Role>>), HttpError> {
    let role = RoleService::new(&state.pool)
        .create_role(payload)
        .await
        .map_err(service_error_to_http)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(role, "Role created successfully")),
    ))
}

/// Creates the named role or replaces its permissions.
#[axum::debug_handler]
pub async fn upsert_role_permissions(
    Extension(state): Extension<AppState>,
    Json(payload): Json<UpsertRolePermissionsRequest>,
) -> Result<Json<ApiResponse<Role>>, HttpError> {
    let role = RoleService::new(&state.pool)
        .upsert_permissions(payload)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        role,
        "Role permissions saved successfully",
    )))
}

#[axum::debug_handler]
pub async fn update_role(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<ApiResponse<Role>>, HttpError> {
    let role = RoleService::new(&state.pool)
        .update_role(&id, payload)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(role, "Role updated successfully")))
}

#[axum::debug_handler]
pub async fn delete_role(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, HttpError> {
    RoleService::new(&state.pool)
        .delete_role(&id)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success((), "Role deleted successfully")))
}

/// Blanks a role's description and color.
#[axum::debug_handler]
pub async fn clear_role_meta(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Role>>, HttpError> {
    let role = RoleService::new(&state.pool)
        .clear_meta(&id)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(role, "Role details cleared")))
}

#[axum::debug_handler]
pub async fn reset_role_permissions(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Role>>, HttpError> {
    let role = RoleService::new(&state.pool)
        .reset_permissions(&id)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(role, "Role permissions reset")))
}

#[axum::debug_handler]
pub async fn get_permissions_by_role_name(
    Extension(state): Extension<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<Vec<PermissionEntry>>>, HttpError> {
    let permissions = RoleService::new(&state.pool)
        .permissions_by_name(&name)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        permissions,
        "Permissions retrieved successfully",
    )))
}

#[axum::debug_handler]
pub async fn get_roles_with_user_count(
    Extension(state): Extension<AppState>,
) -> Result<Json<ApiResponse<Vec<RoleWithUserCount>>>, HttpError> {
    let roles = RoleService::new(&state.pool)
        .list_with_user_count()
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        roles,
        "Roles retrieved successfully",
    )))
}
