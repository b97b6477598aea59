//! Database models and request/response DTOs.
//!
//! Row types derive `FromRow` and map one-to-one onto the tables created by
//! the migrations. Request types derive `Validate` and are checked by the
//! service layer before anything is written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use validator::Validate;

// ───────────────────────────── Users ─────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserStatus::Active => write!(f, "active"),
            UserStatus::Inactive => write!(f, "inactive"),
            UserStatus::Suspended => write!(f, "suspended"),
        }
    }
}

impl std::str::FromStr for UserStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            "suspended" => Ok(UserStatus::Suspended),
            _ => Err(format!("Invalid user status: {}", s)),
        }
    }
}

/// A stored user. The password hash and live session token never leave the
/// process: both are skipped when the user is serialized into a response.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role_name: String,
    pub role_id: Option<String>,
    pub status: UserStatus,
    pub phone: String,
    pub company: String,
    pub specialization: String,
    #[serde(skip_serializing, default)]
    pub current_session_token: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(
        email(message = "Must be a valid email"),
        length(max = 255, message = "Email too long")
    )]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(length(min = 1, message = "Role name is required"))]
    pub role_name: String,

    pub status: Option<UserStatus>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub specialization: Option<String>,
}

/// Insert payload for the user repository. The password is already hashed.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role_name: String,
    pub role_id: Option<String>,
    pub status: UserStatus,
    pub phone: String,
    pub company: String,
    pub specialization: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub specialization: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserStatusRequest {
    pub status: UserStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

// ───────────────────────────── Roles ─────────────────────────────

/// An action a permission entry can allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    Read,
    Write,
    Edit,
    Delete,
    ViewOnly,
}

impl std::fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionAction::Read => write!(f, "read"),
            PermissionAction::Write => write!(f, "write"),
            PermissionAction::Edit => write!(f, "edit"),
            PermissionAction::Delete => write!(f, "delete"),
            PermissionAction::ViewOnly => write!(f, "view_only"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionActions {
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub edit: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub view_only: bool,
}

impl PermissionActions {
    pub fn allows(&self, action: PermissionAction) -> bool {
        match action {
            PermissionAction::Read => self.read,
            PermissionAction::Write => self.write,
            PermissionAction::Edit => self.edit,
            PermissionAction::Delete => self.delete,
            PermissionAction::ViewOnly => self.view_only,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub module: String,
    #[serde(default)]
    pub submodule: String,
    #[serde(default)]
    pub actions: PermissionActions,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: String,
    pub color: String,
    #[sqlx(json)]
    pub permissions: Vec<PermissionEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 64, message = "Role name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub permissions: Vec<PermissionEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, max = 64, message = "Role name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub permissions: Option<Vec<PermissionEntry>>,
}

/// Creates the named role or replaces its permission list.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpsertRolePermissionsRequest {
    #[validate(length(min = 1, max = 64, message = "Role name is required"))]
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<PermissionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleWithUserCount {
    #[serde(flatten)]
    pub role: Role,
    pub user_count: i64,
}

// ──────────────────────── Projects and tasks ────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Sort weight used by the task listings; higher comes first.
    pub fn weight(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub building_id: String,
    pub floor_unit_id: String,
    pub unit_id: String,
    pub site_incharge_id: String,
    pub description: String,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Project name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Building is required"))]
    pub building_id: String,
    #[validate(length(min = 1, message = "Floor unit is required"))]
    pub floor_unit_id: String,
    #[validate(length(min = 1, message = "Unit is required"))]
    pub unit_id: String,
    #[validate(length(min = 1, message = "Site incharge is required"))]
    pub site_incharge_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub contractors: Vec<String>,
}

/// A project with its roster, per-unit task lists and per-unit assignments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDetails {
    #[serde(flatten)]
    pub project: Project,
    pub contractors: Vec<String>,
    pub units: BTreeMap<String, Vec<Task>>,
    pub assigned_contractors: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContractorStatus {
    InProgress,
    Completed,
    /// Declared for the contractor track but never entered by any transition.
    PendingReview,
}

impl std::fmt::Display for ContractorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractorStatus::InProgress => write!(f, "in_progress"),
            ContractorStatus::Completed => write!(f, "completed"),
            ContractorStatus::PendingReview => write!(f, "pending_review"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SiteInchargeStatus {
    PendingVerification,
    Approved,
    Rework,
    Rejected,
}

impl std::fmt::Display for SiteInchargeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiteInchargeStatus::PendingVerification => write!(f, "pending_verification"),
            SiteInchargeStatus::Approved => write!(f, "approved"),
            SiteInchargeStatus::Rework => write!(f, "rework"),
            SiteInchargeStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Outcome a site-incharge records when reviewing a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VerificationDecision {
    #[serde(alias = "approve", alias = "Approved", alias = "Approve")]
    Approved,
    #[serde(alias = "Rework")]
    Rework,
    #[serde(alias = "reject", alias = "Rejected", alias = "Reject")]
    Rejected,
}

impl From<VerificationDecision> for SiteInchargeStatus {
    fn from(decision: VerificationDecision) -> Self {
        match decision {
            VerificationDecision::Approved => SiteInchargeStatus::Approved,
            VerificationDecision::Rework => SiteInchargeStatus::Rework,
            VerificationDecision::Rejected => SiteInchargeStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QualityAssessment {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

/// Which party uploaded a task photo.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PhotoSide {
    Contractor,
    SiteIncharge,
}

/// A construction task. Rows live in the task arena; photo lists are filled
/// from `task_photos` after the row is loaded.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub unit: String,
    pub position: i64,
    pub contractor_id: String,
    pub title: String,
    pub description: String,
    pub status_for_contractor: ContractorStatus,
    pub status_for_site_incharge: SiteInchargeStatus,
    pub progress_percentage: i64,
    pub is_approved_by_contractor: bool,
    pub is_approved_by_site_manager: bool,
    pub construction_phase: String,
    pub deadline: DateTime<Utc>,
    pub priority: Priority,
    pub quality_assessment: Option<QualityAssessment>,
    pub verification_decision: Option<VerificationDecision>,
    pub evidence_title: Option<String>,
    pub site_incharge_note: Option<String>,
    pub submitted_by_contractor_on: Option<DateTime<Utc>>,
    pub submitted_by_site_incharge_on: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default)]
    pub contractor_uploaded_photos: Vec<String>,
    #[sqlx(skip)]
    #[serde(default)]
    pub site_incharge_uploaded_photos: Vec<String>,
}

impl Task {
    /// A task is done only once both parties have approved it.
    pub fn is_done(&self) -> bool {
        self.is_approved_by_contractor && self.is_approved_by_site_manager
    }
}

/// Insert payload for a new task in its initial state.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub project_id: String,
    pub unit: String,
    pub contractor_id: String,
    pub title: String,
    pub description: String,
    pub construction_phase: String,
    pub deadline: DateTime<Utc>,
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, message = "Unit is required"))]
    pub unit: String,
    #[validate(length(min = 1, message = "Contractor is required"))]
    pub contractor_id: String,
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub construction_phase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AssignTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Contractor is required"))]
    pub contractor_id: String,
    #[validate(length(min = 1, message = "Project is required"))]
    pub project_id: String,
    #[validate(length(min = 1, message = "Unit is required"))]
    pub unit: String,
    #[serde(default)]
    pub priority: Priority,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub construction_phase: String,
    pub quality_issue_id: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AssignContractorRequest {
    #[validate(length(min = 1, message = "Unit is required"))]
    pub unit: String,
    #[validate(length(min = 1, message = "Contractor is required"))]
    pub contractor_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ContractorSubmitRequest {
    #[serde(default)]
    pub photos: Vec<String>,
    pub evidence_title: Option<String>,
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress_percentage: Option<i64>,
    pub status: Option<ContractorStatus>,
    pub construction_phase: Option<String>,
    #[serde(default)]
    pub should_submit: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ContractorQuickUpdateRequest {
    pub construction_phase: Option<String>,
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress_percentage: Option<i64>,
    pub status: Option<ContractorStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SiteInchargeReviewRequest {
    #[serde(default)]
    pub photos: Vec<String>,
    #[validate(length(max = 2000, message = "Note too long"))]
    pub note: Option<String>,
    pub quality_assessment: Option<QualityAssessment>,
    pub verification_decision: VerificationDecision,
}

// ───────────────────────────── Quality issues ─────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Minor,
    Major,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    UnderReview,
    Resolved,
}

impl std::str::FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(IssueStatus::Open),
            "under_review" => Ok(IssueStatus::UnderReview),
            "resolved" => Ok(IssueStatus::Resolved),
            _ => Err(format!("Invalid quality issue status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QualityIssue {
    pub id: String,
    pub project_id: String,
    pub unit: String,
    pub title: String,
    pub severity: IssueSeverity,
    pub status: IssueStatus,
    pub contractor_id: Option<String>,
    pub reported_by: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQualityIssueRequest {
    #[validate(length(min = 1, message = "Unit is required"))]
    pub unit: String,
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    pub severity: IssueSeverity,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CreateQualityIssue {
    pub project_id: String,
    pub unit: String,
    pub title: String,
    pub severity: IssueSeverity,
    pub reported_by: String,
    pub description: String,
}

/// Raw status so an unknown value is reported as a validation error rather
/// than a body rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateQualityIssueStatusRequest {
    pub status: String,
}

// ───────────────────────────── Contractor roster ─────────────────────────────

/// One contractor seen from a site incharge: contact details, the supervised
/// projects they are on and how much of their work there is approved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractorSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub specialization: String,
    pub status: UserStatus,
    pub projects: Vec<String>,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub completion_rate: f64,
}

// ───────────────────────────── Notifications ─────────────────────────────

/// An inbox entry. The same value is pushed to live connections and stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    #[sqlx(json)]
    pub data: serde_json::Value,
    pub triggered_by: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: impl Into<String>,
        kind: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            user_id: user_id.into(),
            kind: kind.into(),
            title: title.into(),
            message: message.into(),
            data,
            triggered_by: None,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    /// Records the user whose action raised the notification.
    pub fn triggered_by(mut self, user_id: impl Into<String>) -> Self {
        self.triggered_by = Some(user_id.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendNotificationRequest {
    #[validate(length(min = 1, message = "Recipient is required"))]
    pub user_id: String,
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "Message is required"))]
    pub message: String,
    pub kind: Option<String>,
    pub data: Option<serde_json::Value>,
}

// ───────────────────────────── Task updates ─────────────────────────────

/// Field-level changes to one task. `None` leaves a column as stored; photo
/// lists are appended, never replaced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub progress_percentage: Option<i64>,
    pub construction_phase: Option<String>,
    pub status_for_contractor: Option<ContractorStatus>,
    pub status_for_site_incharge: Option<SiteInchargeStatus>,
    pub is_approved_by_contractor: Option<bool>,
    pub is_approved_by_site_manager: Option<bool>,
    pub quality_assessment: Option<QualityAssessment>,
    pub verification_decision: Option<VerificationDecision>,
    pub evidence_title: Option<String>,
    pub site_incharge_note: Option<String>,
    pub submitted_by_contractor_on: Option<DateTime<Utc>>,
    pub submitted_by_site_incharge_on: Option<DateTime<Utc>>,
    pub contractor_photos: Vec<String>,
    pub site_incharge_photos: Vec<String>,
}
