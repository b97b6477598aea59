//! Project business logic service.
//!
//! Creates projects, assembles the per-unit view of a project from the task
//! arena and scopes project listings by the caller's role. Also serves the
//! site incharge's contractor roster and the quality issue lifecycle.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use crate::auth::guard::{modules, roles};
use crate::auth::models::SessionUser;
use crate::database::models::{
    ContractorSummary, CreateProjectRequest, CreateQualityIssue, CreateQualityIssueRequest,
    IssueStatus, PermissionAction, Project, ProjectDetails, QualityIssue, SiteInchargeStatus,
    Task, UpdateQualityIssueStatusRequest,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::project_repository::ProjectRepository;
use crate::repositories::quality_issue_repository::QualityIssueRepository;
use crate::repositories::task_repository::TaskRepository;
use crate::repositories::user_repository::UserRepository;
use crate::services::task_service::sort_by_priority;
use crate::services::user_service::{contractor_required, site_incharge_required};
use crate::state::AppState;
use validator::Validate;

pub struct ProjectService<'a> {
    state: &'a AppState,
}

impl<'a> ProjectService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Creates a project with an optional initial roster.
    ///
    /// # Errors
    /// - `PermissionDenied` without `projects.write`
    /// - `NotFound` if `site_incharge_id` is not a site incharge or a listed
    ///   contractor is not a contractor
    pub async fn create_project(
        &self,
        caller: &SessionUser,
        request: CreateProjectRequest,
    ) -> ServiceResult<Project> {
        self.state
            .authorizer
            .require(caller, modules::PROJECTS, PermissionAction::Write)?;
        request
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        site_incharge_required(&self.state.pool, &request.site_incharge_id).await?;
        for contractor_id in &request.contractors {
            contractor_required(&self.state.pool, contractor_id).await?;
        }

        let project = ProjectRepository::new(&self.state.pool)
            .create_project(&request)
            .await?;

        tracing::info!(
            "Project {} created by {} with site incharge {}",
            project.id,
            caller.id(),
            project.site_incharge_id
        );
        Ok(project)
    }

    /// Loads a project with its roster, unit task lists and unit assignments.
    pub async fn get_project_details(&self, project_id: &str) -> ServiceResult<ProjectDetails> {
        let projects = ProjectRepository::new(&self.state.pool);
        let project = projects
            .get_project_by_id(project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project", project_id))?;

        let contractors = projects.get_contractors(&project.id).await?;
        let assigned_contractors = projects.get_unit_assignments(&project.id).await?;
        let tasks = TaskRepository::new(&self.state.pool)
            .get_tasks_by_project(&project.id)
            .await?;

        Ok(ProjectDetails {
            project,
            contractors,
            units: group_by_unit(tasks),
            assigned_contractors,
        })
    }

    /// Projects visible to the caller's role.
    ///
    /// # Errors
    /// `InvalidOperation` for roles with no project listing
    pub async fn list_projects_for(&self, caller: &SessionUser) -> ServiceResult<Vec<Project>> {
        let repo = ProjectRepository::new(&self.state.pool);

        let projects = match caller.role_name() {
            roles::SITE_INCHARGE => repo.get_projects_by_site_incharge(caller.id()).await?,
            roles::CONTRACTOR => repo.get_projects_by_contractor(caller.id()).await?,
            roles::ADMIN | roles::OWNER | roles::ACCOUNTANT | roles::CUSTOMER_PURCHASED => {
                repo.get_all_projects().await?
            }
            other => {
                return Err(ServiceError::invalid_operation(format!(
                    "Role '{}' has no project listing",
                    other
                )));
            }
        };

        Ok(projects)
    }

    /// Records a quality issue against a unit of the project.
    pub async fn report_quality_issue(
        &self,
        caller: &SessionUser,
        project_id: &str,
        request: CreateQualityIssueRequest,
    ) -> ServiceResult<QualityIssue> {
        self.state
            .authorizer
            .require(caller, modules::PROJECTS, PermissionAction::Edit)?;
        request
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        let project = ProjectRepository::new(&self.state.pool)
            .get_project_by_id(project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project", project_id))?;

        let issue = QualityIssueRepository::new(&self.state.pool)
            .create_issue(&CreateQualityIssue {
                project_id: project.id,
                unit: request.unit,
                title: request.title,
                severity: request.severity,
                reported_by: caller.id().to_string(),
                description: request.description,
            })
            .await?;

        tracing::info!("Quality issue {} reported on unit {}", issue.id, issue.unit);
        Ok(issue)
    }

    /// Quality issues the caller reported or was assigned, newest first.
    pub async fn list_quality_issues_for(
        &self,
        caller: &SessionUser,
    ) -> ServiceResult<Vec<QualityIssue>> {
        Ok(QualityIssueRepository::new(&self.state.pool)
            .get_issues_for_user(caller.id())
            .await?)
    }

    /// Moves a quality issue to `open`, `under_review` or `resolved`.
    ///
    /// # Errors
    /// - `PermissionDenied` without `projects.edit`
    /// - `Validation` for any other status
    /// - `NotFound` for an unknown issue
    pub async fn update_quality_issue_status(
        &self,
        caller: &SessionUser,
        issue_id: &str,
        request: UpdateQualityIssueStatusRequest,
    ) -> ServiceResult<QualityIssue> {
        self.state
            .authorizer
            .require(caller, modules::PROJECTS, PermissionAction::Edit)?;

        let status: IssueStatus = request
            .status
            .trim()
            .parse()
            .map_err(ServiceError::validation)?;

        let issue = QualityIssueRepository::new(&self.state.pool)
            .update_status(issue_id, status)
            .await?
            .ok_or_else(|| ServiceError::not_found("Quality issue", issue_id))?;

        tracing::info!(
            "Quality issue {} moved to {} by {}",
            issue.id,
            request.status.trim(),
            caller.id()
        );
        Ok(issue)
    }

    /// Contractors on the rosters of the caller's projects with their task
    /// totals there, most approved work first.
    ///
    /// # Errors
    /// `PermissionDenied` unless the caller is a site incharge
    pub async fn contractors_for_site_incharge(
        &self,
        caller: &SessionUser,
    ) -> ServiceResult<Vec<ContractorSummary>> {
        ensure_site_incharge(caller)?;

        let projects = ProjectRepository::new(&self.state.pool);
        let tasks = TaskRepository::new(&self.state.pool);
        let users = UserRepository::new(&self.state.pool);

        let mut roster = ContractorRoster::default();
        for project in projects.get_projects_by_site_incharge(caller.id()).await? {
            let project_tasks = tasks.get_tasks_by_project(&project.id).await?;

            for contractor_id in projects.get_contractors(&project.id).await? {
                if !roster.contains(&contractor_id) {
                    let Some(user) = users.get_user_by_id(&contractor_id).await? else {
                        tracing::warn!(
                            "Roster of project {} lists unknown contractor {}",
                            project.id,
                            contractor_id
                        );
                        continue;
                    };
                    roster.insert(ContractorSummary {
                        id: user.id,
                        name: user.name,
                        email: user.email,
                        phone: user.phone,
                        company: user.company,
                        specialization: user.specialization,
                        status: user.status,
                        projects: Vec::new(),
                        total_tasks: 0,
                        completed_tasks: 0,
                        completion_rate: 0.0,
                    });
                }
                roster.record(&contractor_id, &project, &project_tasks);
            }
        }

        Ok(roster.finish())
    }

    /// The contractor's tasks in projects the caller supervises, highest
    /// priority first.
    ///
    /// # Errors
    /// `PermissionDenied` unless the caller is a site incharge
    pub async fn contractor_tasks_under_site_incharge(
        &self,
        caller: &SessionUser,
        contractor_id: &str,
    ) -> ServiceResult<Vec<Task>> {
        ensure_site_incharge(caller)?;

        let mut tasks = TaskRepository::new(&self.state.pool)
            .get_contractor_tasks_under_site_incharge(caller.id(), contractor_id)
            .await?;
        sort_by_priority(&mut tasks);
        Ok(tasks)
    }
}

fn ensure_site_incharge(caller: &SessionUser) -> ServiceResult<()> {
    if caller.role_name() == roles::SITE_INCHARGE {
        Ok(())
    } else {
        Err(ServiceError::permission_denied(
            "Only site incharges can view their contractors",
        ))
    }
}

/// Accumulates per-contractor totals in first-seen order.
#[derive(Default)]
struct ContractorRoster {
    entries: Vec<ContractorSummary>,
    index: HashMap<String, usize>,
}

impl ContractorRoster {
    fn contains(&self, contractor_id: &str) -> bool {
        self.index.contains_key(contractor_id)
    }

    fn insert(&mut self, summary: ContractorSummary) {
        self.index.insert(summary.id.clone(), self.entries.len());
        self.entries.push(summary);
    }

    fn record(&mut self, contractor_id: &str, project: &Project, tasks: &[Task]) {
        let Some(&slot) = self.index.get(contractor_id) else {
            return;
        };
        let entry = &mut self.entries[slot];

        let project_name = if project.name.is_empty() {
            project.id.clone()
        } else {
            project.name.clone()
        };
        if !entry.projects.contains(&project_name) {
            entry.projects.push(project_name);
        }

        for task in tasks.iter().filter(|task| task.contractor_id == contractor_id) {
            entry.total_tasks += 1;
            if task.status_for_site_incharge == SiteInchargeStatus::Approved {
                entry.completed_tasks += 1;
            }
        }
    }

    fn finish(mut self) -> Vec<ContractorSummary> {
        for entry in &mut self.entries {
            entry.completion_rate = completion_rate(entry.completed_tasks, entry.total_tasks);
        }
        self.entries.sort_by_key(|entry| Reverse(entry.completed_tasks));
        self.entries
    }
}

/// Percentage of approved tasks rounded to one decimal, 0.0 with no tasks.
fn completion_rate(completed: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed as f64 * 1000.0 / total as f64).round() / 10.0
}

/// Groups tasks already ordered by unit and position into per-unit lists.
fn group_by_unit(tasks: Vec<Task>) -> BTreeMap<String, Vec<Task>> {
    let mut units: BTreeMap<String, Vec<Task>> = BTreeMap::new();
    for task in tasks {
        units.entry(task.unit.clone()).or_default().push(task);
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_rate_rounds_to_one_decimal() {
        assert_eq!(completion_rate(0, 0), 0.0);
        assert_eq!(completion_rate(1, 3), 33.3);
        assert_eq!(completion_rate(2, 3), 66.7);
        assert_eq!(completion_rate(4, 4), 100.0);
    }
}
