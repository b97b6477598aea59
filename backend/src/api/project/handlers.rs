//! Handler functions for project and task workflow endpoints.
//!
//! Capability and actor checks live in the services; these handlers only
//! extract the caller, the path and the payload.

use crate::api::common::{ApiResponse, HttpError, service_error_to_http};
use crate::auth::models::SessionUser;
use crate::database::models::{
    AssignContractorRequest, AssignTaskRequest, ContractorQuickUpdateRequest,
    ContractorSubmitRequest, ContractorSummary, CreateProjectRequest, CreateQualityIssueRequest,
    CreateTaskRequest, Project, ProjectDetails, QualityIssue, SiteInchargeReviewRequest, Task,
    UpdateQualityIssueStatusRequest,
};
use crate::services::assignment_service::AssignmentService;
use crate::services::project_service::ProjectService;
use crate::services::task_service::TaskService;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
};

#[axum::debug_handler]
pub async fn create_project(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Project>>), HttpError> {
    let project = ProjectService::new(&state)
        .create_project(&session, payload)
        .await
        .map_err(service_error_to_http)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(project, "Project created successfully")),
    ))
}

/// Lists the projects visible to the caller's role.
#[axum::debug_handler]
pub async fn list_projects(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
) -> Result<Json<ApiResponse<Vec<Project>>>, HttpError> {
    let projects = ProjectService::new(&state)
        .list_projects_for(&session)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        projects,
        "Projects retrieved successfully",
    )))
}

/// Project with roster, unit task lists and unit assignments.
#[axum::debug_handler]
pub async fn get_project(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProjectDetails>>, HttpError> {
    let details = ProjectService::new(&state)
        .get_project_details(&id)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        details,
        "Project retrieved successfully",
    )))
}

#[axum::debug_handler]
pub async fn assign_contractor_to_unit(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<String>,
    Json(payload): Json<AssignContractorRequest>,
) -> Result<Json<ApiResponse<ProjectDetails>>, HttpError> {
    AssignmentService::new(&state)
        .assign_contractor_to_unit(&session, &id, payload)
        .await
        .map_err(service_error_to_http)?;

    let details = ProjectService::new(&state)
        .get_project_details(&id)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        details,
        "Contractor assigned successfully",
    )))
}

#[axum::debug_handler]
pub async fn create_task(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<String>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Task>>), HttpError> {
    let task = TaskService::new(&state)
        .create_task(&session, &id, payload)
        .await
        .map_err(service_error_to_http)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(task, "Task created successfully")),
    ))
}

#[axum::debug_handler]
pub async fn assign_task_to_contractor(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
    Json(payload): Json<AssignTaskRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Task>>), HttpError> {
    let task = AssignmentService::new(&state)
        .assign_task_to_contractor(&session, payload)
        .await
        .map_err(service_error_to_http)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(task, "Task assigned successfully")),
    ))
}

#[axum::debug_handler]
pub async fn contractor_update_task(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
    Path((id, task_id)): Path<(String, String)>,
    Json(payload): Json<ContractorSubmitRequest>,
) -> Result<Json<ApiResponse<Task>>, HttpError> {
    let task = TaskService::new(&state)
        .contractor_submit(&session, &id, &task_id, payload)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(task, "Task updated successfully")))
}

#[axum::debug_handler]
pub async fn contractor_quick_update(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
    Path((id, task_id)): Path<(String, String)>,
    Json(payload): Json<ContractorQuickUpdateRequest>,
) -> Result<Json<ApiResponse<Task>>, HttpError> {
    let task = TaskService::new(&state)
        .contractor_quick_update(&session, &id, &task_id, payload)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(task, "Task progress updated")))
}

#[axum::debug_handler]
pub async fn site_incharge_update_task(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
    Path((id, task_id)): Path<(String, String)>,
    Json(payload): Json<SiteInchargeReviewRequest>,
) -> Result<Json<ApiResponse<Task>>, HttpError> {
    let task = TaskService::new(&state)
        .site_incharge_review(&session, &id, &task_id, payload)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(task, "Task verified successfully")))
}

/// Tasks visible to the caller's role, highest priority first.
#[axum::debug_handler]
pub async fn list_tasks(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
) -> Result<Json<ApiResponse<Vec<Task>>>, HttpError> {
    let tasks = TaskService::new(&state)
        .list_tasks_for(&session)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        tasks,
        "Tasks retrieved successfully",
    )))
}

#[axum::debug_handler]
pub async fn report_quality_issue(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<String>,
    Json(payload): Json<CreateQualityIssueRequest>,
) -> Result<(StatusCode, Json<ApiResponse<QualityIssue>>), HttpError> {
    let issue = ProjectService::new(&state)
        .report_quality_issue(&session, &id, payload)
        .await
        .map_err(service_error_to_http)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(issue, "Quality issue reported")),
    ))
}

/// Quality issues the caller reported or was assigned.
#[axum::debug_handler]
pub async fn list_quality_issues(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
) -> Result<Json<ApiResponse<Vec<QualityIssue>>>, HttpError> {
    let issues = ProjectService::new(&state)
        .list_quality_issues_for(&session)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        issues,
        "Quality issues retrieved successfully",
    )))
}

#[axum::debug_handler]
pub async fn update_quality_issue_status(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
    Path(issue_id): Path<String>,
    Json(payload): Json<UpdateQualityIssueStatusRequest>,
) -> Result<Json<ApiResponse<QualityIssue>>, HttpError> {
    let issue = ProjectService::new(&state)
        .update_quality_issue_status(&session, &issue_id, payload)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        issue,
        "Quality issue status updated",
    )))
}

#[axum::debug_handler]
pub async fn list_site_incharge_contractors(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
) -> Result<Json<ApiResponse<Vec<ContractorSummary>>>, HttpError> {
    let contractors = ProjectService::new(&state)
        .contractors_for_site_incharge(&session)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        contractors,
        "Contractors retrieved successfully",
    )))
}

#[axum::debug_handler]
pub async fn list_contractor_tasks(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
    Path(contractor_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Task>>>, HttpError> {
    let tasks = ProjectService::new(&state)
        .contractor_tasks_under_site_incharge(&session, &contractor_id)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        tasks,
        "Contractor tasks retrieved successfully",
    )))
}
