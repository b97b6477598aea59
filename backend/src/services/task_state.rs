//! Transitions of the construction task state machine.
//!
//! A task carries two independent tracks: the contractor track
//! (`in_progress -> completed`) and the site-incharge track
//! (`pending_verification -> approved | rework | rejected`). The planners
//! here are pure: they look at the current task and a request and return the
//! field-level [`TaskPatch`] to merge, or an error if the transition is not
//! allowed. Actor binding and persistence happen in the task service.

use chrono::{DateTime, Utc};

use crate::database::models::{
    ContractorQuickUpdateRequest, ContractorStatus, ContractorSubmitRequest,
    SiteInchargeReviewRequest, SiteInchargeStatus, Task, TaskPatch, VerificationDecision,
};
use crate::errors::{ServiceError, ServiceResult};

/// Whether a site-incharge may review a task the contractor has not
/// submitted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewPolicy {
    /// The review is recorded; the task still is not done until the
    /// contractor approves it too.
    AllowBeforeSubmission,
    /// The review is refused with `InvalidOperation`.
    RequireSubmission,
}

impl ReviewPolicy {
    pub fn from_flag(require_submission: bool) -> Self {
        if require_submission {
            ReviewPolicy::RequireSubmission
        } else {
            ReviewPolicy::AllowBeforeSubmission
        }
    }
}

fn check_contractor_status(status: Option<ContractorStatus>) -> ServiceResult<()> {
    match status {
        Some(ContractorStatus::PendingReview) => Err(ServiceError::validation(
            "status: 'pending_review' cannot be set directly",
        )),
        _ => Ok(()),
    }
}

/// Plans a contractor submission. Photos are appended. With `should_submit`
/// the contractor approves their own work and the submission date is stamped.
pub fn plan_contractor_submission(
    task: &Task,
    request: &ContractorSubmitRequest,
    now: DateTime<Utc>,
) -> ServiceResult<TaskPatch> {
    check_contractor_status(request.status)?;

    let mut patch = TaskPatch {
        progress_percentage: request.progress_percentage,
        construction_phase: request.construction_phase.clone(),
        status_for_contractor: request.status,
        evidence_title: request.evidence_title.clone(),
        contractor_photos: request.photos.clone(),
        ..Default::default()
    };

    if request.should_submit {
        patch.is_approved_by_contractor = Some(true);
        patch.submitted_by_contractor_on = Some(now);
        tracing::debug!("Task {} submitted by contractor", task.id);
    }

    Ok(patch)
}

/// Plans a quick progress update. Reaching 100% or `completed` counts as the
/// contractor's approval.
pub fn plan_quick_update(
    task: &Task,
    request: &ContractorQuickUpdateRequest,
) -> ServiceResult<TaskPatch> {
    check_contractor_status(request.status)?;

    let mut patch = TaskPatch {
        progress_percentage: request.progress_percentage,
        construction_phase: request.construction_phase.clone(),
        status_for_contractor: request.status,
        ..Default::default()
    };

    let finished = request.progress_percentage == Some(100)
        || request.status == Some(ContractorStatus::Completed);
    if finished && !task.is_approved_by_contractor {
        patch.is_approved_by_contractor = Some(true);
    }

    Ok(patch)
}

/// Plans a site-incharge review. The decision becomes the site-incharge
/// status; only `approved` sets the site manager's approval, any other
/// decision clears it.
pub fn plan_site_incharge_review(
    task: &Task,
    request: &SiteInchargeReviewRequest,
    policy: ReviewPolicy,
    now: DateTime<Utc>,
) -> ServiceResult<TaskPatch> {
    if !task.is_approved_by_contractor {
        match policy {
            ReviewPolicy::RequireSubmission => {
                return Err(ServiceError::invalid_operation(
                    "Task has not been submitted by the contractor yet",
                ));
            }
            ReviewPolicy::AllowBeforeSubmission => {
                tracing::warn!(
                    "Task {} reviewed before contractor submission",
                    task.id
                );
            }
        }
    }

    let decision = request.verification_decision;

    Ok(TaskPatch {
        status_for_site_incharge: Some(SiteInchargeStatus::from(decision)),
        is_approved_by_site_manager: Some(decision == VerificationDecision::Approved),
        verification_decision: Some(decision),
        quality_assessment: request.quality_assessment,
        site_incharge_note: request.note.clone(),
        submitted_by_site_incharge_on: Some(now),
        site_incharge_photos: request.photos.clone(),
        ..Default::default()
    })
}
