//! Defines the HTTP routes for projects and the task workflow.
//!
//! The contractor and site-incharge task updates are fenced by role here;
//! module capabilities and actor binding are checked by the services.

use super::handlers::*;
use crate::auth::guard::{modules, roles};
use crate::auth::middleware::{
    AllowedRoles, RequiredPermission, require_permission, require_role, session_auth,
};
use crate::database::models::PermissionAction;
use crate::state::AppState;
use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

const CAN_READ: RequiredPermission =
    RequiredPermission::new(modules::PROJECTS, PermissionAction::Read);
const CONTRACTORS: AllowedRoles = AllowedRoles(&[roles::CONTRACTOR]);
const SITE_INCHARGES: AllowedRoles = AllowedRoles(&[roles::SITE_INCHARGE]);

pub fn project_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(create_project).get(list_projects))
        .route("/tasks", get(list_tasks))
        .route("/assign-task", post(assign_task_to_contractor))
        .route("/quality-issues", get(list_quality_issues))
        .route(
            "/quality-issues/{issue_id}/status",
            patch(update_quality_issue_status),
        )
        .route(
            "/site-incharge/contractors",
            get(list_site_incharge_contractors)
                .layer(middleware::from_fn_with_state(SITE_INCHARGES, require_role)),
        )
        .route(
            "/site-incharge/contractors/{contractor_id}/tasks",
            get(list_contractor_tasks)
                .layer(middleware::from_fn_with_state(SITE_INCHARGES, require_role)),
        )
        .route(
            "/{id}",
            get(get_project).layer(middleware::from_fn_with_state(CAN_READ, require_permission)),
        )
        .route("/{id}/contractors", post(assign_contractor_to_unit))
        .route("/{id}/tasks", post(create_task))
        .route("/{id}/quality-issues", post(report_quality_issue))
        .route(
            "/{id}/tasks/{task_id}/contractor",
            patch(contractor_update_task)
                .layer(middleware::from_fn_with_state(CONTRACTORS, require_role)),
        )
        .route(
            "/{id}/tasks/{task_id}/progress",
            patch(contractor_quick_update)
                .layer(middleware::from_fn_with_state(CONTRACTORS, require_role)),
        )
        .route(
            "/{id}/tasks/{task_id}/site-incharge",
            patch(site_incharge_update_task)
                .layer(middleware::from_fn_with_state(SITE_INCHARGES, require_role)),
        )
        .layer(middleware::from_fn_with_state(state, session_auth))
}
