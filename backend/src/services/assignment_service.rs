//! Binding contractors to projects, units and quality issues.
//!
//! Every write here keeps the roster invariant: a contractor that appears in
//! a unit's task list or assignment list is also on the project roster.

use crate::auth::guard::modules;
use crate::auth::models::SessionUser;
use crate::database::models::{
    AssignContractorRequest, AssignTaskRequest, NewTask, PermissionAction, Project, Task,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::project_repository::ProjectRepository;
use crate::repositories::quality_issue_repository::QualityIssueRepository;
use crate::repositories::task_repository::TaskRepository;
use crate::services::task_service::announce_assignment;
use crate::services::user_service::contractor_required;
use crate::state::AppState;
use validator::Validate;

pub struct AssignmentService<'a> {
    state: &'a AppState,
}

impl<'a> AssignmentService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Creates a task for a contractor and, when `quality_issue_id` is set,
    /// points that issue at the same contractor. The task insert, the
    /// roster entry and the issue update commit together.
    ///
    /// # Errors
    /// - `PermissionDenied` without `tasks.write`
    /// - `NotFound` for an unknown contractor, project or quality issue, or
    ///   when `contractor_id` names a user without the contractor role;
    ///   nothing is written in that case
    pub async fn assign_task_to_contractor(
        &self,
        caller: &SessionUser,
        request: AssignTaskRequest,
    ) -> ServiceResult<Task> {
        self.state
            .authorizer
            .require(caller, modules::TASKS, PermissionAction::Write)?;
        request
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        let contractor = contractor_required(&self.state.pool, &request.contractor_id).await?;
        let project = self.project_required(&request.project_id).await?;

        let quality_issue_id = request
            .quality_issue_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        if let Some(issue_id) = quality_issue_id {
            QualityIssueRepository::new(&self.state.pool)
                .get_issue_by_id(issue_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("Quality issue", issue_id))?;
        }

        let new_task = NewTask {
            project_id: project.id.clone(),
            unit: request.unit.clone(),
            contractor_id: contractor.id.clone(),
            title: request.title.clone(),
            description: request.description.clone(),
            construction_phase: request.construction_phase.clone(),
            deadline: request.deadline,
            priority: request.priority,
        };

        let task = TaskRepository::new(&self.state.pool)
            .insert_task(&new_task, quality_issue_id)
            .await?;

        match quality_issue_id {
            Some(issue_id) => tracing::info!(
                "Assigned task {} to contractor {} for quality issue {}",
                task.id,
                contractor.id,
                issue_id
            ),
            None => tracing::info!("Assigned task {} to contractor {}", task.id, contractor.id),
        }

        announce_assignment(self.state, &project, &task, &contractor, caller.id()).await;
        Ok(task)
    }

    /// Adds the contractor to the roster and to the unit's assignment list.
    /// Repeating the call changes nothing.
    pub async fn assign_contractor_to_unit(
        &self,
        caller: &SessionUser,
        project_id: &str,
        request: AssignContractorRequest,
    ) -> ServiceResult<()> {
        self.state
            .authorizer
            .require(caller, modules::PROJECTS, PermissionAction::Edit)?;
        request
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        let project = self.project_required(project_id).await?;
        let contractor = contractor_required(&self.state.pool, &request.contractor_id).await?;

        ProjectRepository::new(&self.state.pool)
            .assign_contractor_to_unit(&project.id, &request.unit, &contractor.id)
            .await?;

        tracing::info!(
            "Contractor {} assigned to unit {} of project {}",
            contractor.id,
            request.unit,
            project.id
        );
        Ok(())
    }

    async fn project_required(&self, project_id: &str) -> ServiceResult<Project> {
        ProjectRepository::new(&self.state.pool)
            .get_project_by_id(project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project", project_id))
    }
}
