//! Construction task workflow.
//!
//! Every mutating operation first asks the [`Authorizer`] for the module
//! capability, then checks that the caller is the party bound to the task:
//! the assigned contractor for the contractor track, the project's
//! site-incharge for the site-incharge track. Only then is the planned
//! [`TaskPatch`] merged.
//!
//! [`Authorizer`]: crate::auth::guard::Authorizer

use chrono::Utc;
use serde_json::json;
use std::cmp::Reverse;

use crate::auth::guard::{modules, roles};
use crate::auth::models::SessionUser;
use crate::database::models::{
    ContractorQuickUpdateRequest, ContractorSubmitRequest, CreateTaskRequest, NewTask,
    Notification, PermissionAction, Project, SiteInchargeReviewRequest, Task, TaskPatch, User,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::project_repository::ProjectRepository;
use crate::repositories::task_repository::TaskRepository;
use crate::services::email_service::spawn_task_assigned_email;
use crate::services::task_state::{
    ReviewPolicy, plan_contractor_submission, plan_quick_update, plan_site_incharge_review,
};
use crate::services::user_service::contractor_required;
use crate::state::AppState;
use validator::Validate;

pub struct TaskService<'a> {
    state: &'a AppState,
}

impl<'a> TaskService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Appends a new task to `request.unit` of the project and puts the
    /// contractor on the roster.
    ///
    /// # Errors
    /// - `PermissionDenied` without `tasks.write`
    /// - `NotFound` if the project does not exist or `contractor_id` is not a
    ///   contractor
    pub async fn create_task(
        &self,
        caller: &SessionUser,
        project_id: &str,
        request: CreateTaskRequest,
    ) -> ServiceResult<Task> {
        self.state
            .authorizer
            .require(caller, modules::TASKS, PermissionAction::Write)?;
        request
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        let project = self.project_required(project_id).await?;
        let contractor = contractor_required(&self.state.pool, &request.contractor_id).await?;

        let new_task = NewTask {
            project_id: project.id.clone(),
            unit: request.unit,
            contractor_id: contractor.id.clone(),
            title: request.title,
            description: request.description,
            construction_phase: request.construction_phase,
            deadline: request.deadline,
            priority: request.priority,
        };

        let task = TaskRepository::new(&self.state.pool)
            .insert_task(&new_task, None)
            .await?;

        tracing::info!(
            "Task {} created in unit {} of project {} for contractor {}",
            task.id,
            task.unit,
            project.id,
            contractor.id
        );

        announce_assignment(self.state, &project, &task, &contractor, caller.id()).await;
        Ok(task)
    }

    /// Records the contractor's progress on a task. Photos are appended;
    /// `should_submit` marks the work as submitted.
    ///
    /// # Errors
    /// - `PermissionDenied` without `tasks.edit` or if the caller is not the
    ///   task's contractor
    /// - `NotFound` if the task is not part of the project
    pub async fn contractor_submit(
        &self,
        caller: &SessionUser,
        project_id: &str,
        task_id: &str,
        request: ContractorSubmitRequest,
    ) -> ServiceResult<Task> {
        self.state
            .authorizer
            .require(caller, modules::TASKS, PermissionAction::Edit)?;
        request
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        let project = self.project_required(project_id).await?;
        let task = self.task_in_project(&project, task_id).await?;
        ensure_contractor(caller, &task)?;

        let patch = plan_contractor_submission(&task, &request, Utc::now())?;
        let updated = self.apply(&task.id, &patch).await?;

        tracing::info!(
            "Contractor {} updated task {} (progress {}%, submitted: {})",
            caller.id(),
            updated.id,
            updated.progress_percentage,
            request.should_submit
        );

        if request.should_submit {
            self.state
                .notifier
                .notify(
                    Notification::new(
                        &project.site_incharge_id,
                        "task_submitted",
                        "Task submitted for verification",
                        format!("{} submitted \"{}\"", caller.user.name, updated.title),
                        json!({ "project_id": project.id, "task_id": updated.id, "unit": updated.unit }),
                    )
                    .triggered_by(caller.id()),
                )
                .await;
        }

        Ok(updated)
    }

    /// Quick update of phase, progress and status from the contractor.
    pub async fn contractor_quick_update(
        &self,
        caller: &SessionUser,
        project_id: &str,
        task_id: &str,
        request: ContractorQuickUpdateRequest,
    ) -> ServiceResult<Task> {
        self.state
            .authorizer
            .require(caller, modules::TASKS, PermissionAction::Edit)?;
        request
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        let project = self.project_required(project_id).await?;
        let task = self.task_in_project(&project, task_id).await?;
        ensure_contractor(caller, &task)?;

        let patch = plan_quick_update(&task, &request)?;
        let updated = self.apply(&task.id, &patch).await?;

        tracing::info!(
            "Contractor {} moved task {} to {}%",
            caller.id(),
            updated.id,
            updated.progress_percentage
        );
        Ok(updated)
    }

    /// Records the site-incharge's verification of a task.
    ///
    /// # Errors
    /// - `PermissionDenied` without `tasks.edit` or if the caller does not
    ///   supervise the project
    /// - `NotFound` if the task is not part of the project
    /// - `InvalidOperation` if the review policy requires a prior submission
    pub async fn site_incharge_review(
        &self,
        caller: &SessionUser,
        project_id: &str,
        task_id: &str,
        request: SiteInchargeReviewRequest,
    ) -> ServiceResult<Task> {
        self.state
            .authorizer
            .require(caller, modules::TASKS, PermissionAction::Edit)?;
        request
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        let project = self.project_required(project_id).await?;
        if project.site_incharge_id != caller.id() {
            tracing::warn!(
                "User {} tried to review a task of project {} supervised by {}",
                caller.id(),
                project.id,
                project.site_incharge_id
            );
            return Err(ServiceError::permission_denied(
                "Only the project's site incharge can verify its tasks",
            ));
        }

        let task = self.task_in_project(&project, task_id).await?;
        let policy = ReviewPolicy::from_flag(self.state.config.review_requires_contractor_submission);

        let patch = plan_site_incharge_review(&task, &request, policy, Utc::now())?;
        let updated = self.apply(&task.id, &patch).await?;

        tracing::info!(
            "Site incharge {} set task {} to {} (done: {})",
            caller.id(),
            updated.id,
            updated.status_for_site_incharge,
            updated.is_done()
        );

        self.state
            .notifier
            .notify(
                Notification::new(
                    &updated.contractor_id,
                    "task_reviewed",
                    "Task verified",
                    format!(
                        "\"{}\" was marked {}",
                        updated.title, updated.status_for_site_incharge
                    ),
                    json!({
                        "project_id": project.id,
                        "task_id": updated.id,
                        "decision": request.verification_decision,
                    }),
                )
                .triggered_by(caller.id()),
            )
            .await;

        Ok(updated)
    }

    /// Tasks visible to the caller's role, highest priority first. Ties keep
    /// their stored order.
    ///
    /// # Errors
    /// `InvalidOperation` for roles that have no task listing
    pub async fn list_tasks_for(&self, caller: &SessionUser) -> ServiceResult<Vec<Task>> {
        let repo = TaskRepository::new(&self.state.pool);

        let mut tasks = match caller.role_name() {
            roles::SITE_INCHARGE => repo.get_tasks_awaiting_site_incharge(caller.id()).await?,
            roles::CONTRACTOR => repo.get_tasks_by_contractor(caller.id()).await?,
            roles::ADMIN | roles::OWNER | roles::CUSTOMER_PURCHASED => repo.get_all_tasks().await?,
            other => {
                return Err(ServiceError::invalid_operation(format!(
                    "Role '{}' has no task listing",
                    other
                )));
            }
        };

        sort_by_priority(&mut tasks);
        Ok(tasks)
    }

    async fn project_required(&self, project_id: &str) -> ServiceResult<Project> {
        ProjectRepository::new(&self.state.pool)
            .get_project_by_id(project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project", project_id))
    }

    async fn task_in_project(&self, project: &Project, task_id: &str) -> ServiceResult<Task> {
        TaskRepository::new(&self.state.pool)
            .get_task_by_id(task_id)
            .await?
            .filter(|task| task.project_id == project.id)
            .ok_or_else(|| ServiceError::not_found("Task", task_id))
    }

    async fn apply(&self, task_id: &str, patch: &TaskPatch) -> ServiceResult<Task> {
        TaskRepository::new(&self.state.pool)
            .apply_patch(task_id, patch)
            .await?
            .ok_or_else(|| ServiceError::not_found("Task", task_id))
    }
}

fn ensure_contractor(caller: &SessionUser, task: &Task) -> ServiceResult<()> {
    if task.contractor_id == caller.id() {
        Ok(())
    } else {
        tracing::warn!(
            "User {} tried to update task {} assigned to {}",
            caller.id(),
            task.id,
            task.contractor_id
        );
        Err(ServiceError::permission_denied(
            "Only the assigned contractor can update this task",
        ))
    }
}

/// Stable sort, highest priority weight first.
pub fn sort_by_priority(tasks: &mut [Task]) {
    tasks.sort_by_key(|task| Reverse(task.priority.weight()));
}

/// Tells the contractor about a new task: in-app right away, by email in the
/// background when a mailer is configured.
pub(crate) async fn announce_assignment(
    state: &AppState,
    project: &Project,
    task: &Task,
    contractor: &User,
    assigned_by: &str,
) {
    state
        .notifier
        .notify(
            Notification::new(
                &contractor.id,
                "task_assigned",
                "New task assigned",
                format!("You have been assigned \"{}\" in unit {}", task.title, task.unit),
                json!({ "project_id": project.id, "task_id": task.id, "unit": task.unit }),
            )
            .triggered_by(assigned_by),
        )
        .await;

    if let Some(mailer) = &state.mailer {
        spawn_task_assigned_email(
            mailer.clone(),
            contractor.email.clone(),
            contractor.name.clone(),
            project,
            task,
        );
    }
}
