//! Handler functions for user administration API endpoints.

use crate::api::common::{
    ApiResponse, HttpError, PaginatedData, PaginationFilter, PaginationMeta,
    service_error_to_http,
};
use crate::auth::models::SessionUser;
use crate::database::models::{
    CreateUserRequest, ResetPasswordRequest, UpdateUserRequest, UpdateUserStatusRequest, User,
};
use crate::services::user_service::UserService;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
};

/// Creates a new user.
#[axum::debug_handler]
pub async fn create_user(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), HttpError> {
    tracing::info!("User {} creating account for {}", session.id(), payload.email);

    let user = UserService::new(&state)
        .create_user(payload)
        .await
        .map_err(service_error_to_http)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(user, "User created successfully")),
    ))
}

/// Lists users other than the caller, one page at a time.
#[axum::debug_handler]
pub async fn list_users(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
    Query(pagination): Query<PaginationFilter>,
) -> Result<Json<ApiResponse<PaginatedData<User>>>, HttpError> {
    let (users, total) = UserService::new(&state)
        .list_users(session.id(), &pagination)
        .await
        .map_err(service_error_to_http)?;

    let meta = PaginationMeta::from_filter(&pagination, total);
    Ok(Json(ApiResponse::paginated(
        PaginatedData::new(users, total),
        meta,
        "Users retrieved successfully",
    )))
}

/// Retrieves a user by its ID.
#[axum::debug_handler]
pub async fn get_user_by_id(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<User>>, HttpError> {
    let user = UserService::new(&state)
        .get_user_required(&id)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        user,
        "User retrieved successfully",
    )))
}

/// Lists the users holding a role.
#[axum::debug_handler]
pub async fn get_users_by_role(
    Extension(state): Extension<AppState>,
    Path(role_name): Path<String>,
) -> Result<Json<ApiResponse<Vec<User>>>, HttpError> {
    let users = UserService::new(&state)
        .list_by_role(&role_name)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        users,
        "Users retrieved successfully",
    )))
}

#[axum::debug_handler]
pub async fn update_user(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<User>>, HttpError> {
    let user = UserService::new(&state)
        .update_profile(&id, payload)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(user, "User updated successfully")))
}

#[axum::debug_handler]
pub async fn update_user_status(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserStatusRequest>,
) -> Result<Json<ApiResponse<User>>, HttpError> {
    tracing::info!(
        "User {} setting status of {} to {}",
        session.id(),
        id,
        payload.status
    );

    let user = UserService::new(&state)
        .update_status(&id, payload.status)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        user,
        "User status updated successfully",
    )))
}

#[axum::debug_handler]
pub async fn reset_password(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<()>>, HttpError> {
    tracing::info!("User {} resetting password of {}", session.id(), id);

    UserService::new(&state)
        .reset_password(&id, payload)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success((), "Password reset successfully")))
}

#[axum::debug_handler]
pub async fn delete_user(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, HttpError> {
    tracing::info!("User {} deleting {}", session.id(), id);

    UserService::new(&state)
        .delete_user(&id)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success((), "User deleted successfully")))
}
