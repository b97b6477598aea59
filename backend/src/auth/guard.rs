//! Authorization checks.
//!
//! Both checks are pure functions of the authenticated caller: no I/O, no
//! shared state. [`Authorizer`] is the capability interface the workflow
//! services consume; [`RolePermissionAuthorizer`] answers it from the
//! caller's role permission entries.

use crate::auth::models::SessionUser;
use crate::database::models::PermissionAction;
use crate::errors::{ServiceError, ServiceResult};

/// Admits the caller only if their role name is in `allowed`.
/// Comparison is exact and case-sensitive.
pub fn authorize_role(allowed: &[&str], user: &SessionUser) -> ServiceResult<()> {
    if allowed.iter().any(|role| *role == user.role_name()) {
        Ok(())
    } else {
        Err(ServiceError::permission_denied(
            "Access denied: insufficient role",
        ))
    }
}

/// Admits the caller only if the first permission entry for `module` allows
/// `action`. A missing entry denies.
pub fn authorize_permission(
    module: &str,
    action: PermissionAction,
    user: &SessionUser,
) -> ServiceResult<()> {
    let allowed = user
        .permissions()
        .iter()
        .find(|entry| entry.module == module)
        .map(|entry| entry.actions.allows(action))
        .unwrap_or(false);

    if allowed {
        Ok(())
    } else {
        Err(ServiceError::permission_denied(format!(
            "Access denied: {} on {}",
            action, module
        )))
    }
}

/// Capability check consumed by every mutating workflow operation.
pub trait Authorizer: Send + Sync {
    fn can(&self, user: &SessionUser, module: &str, action: PermissionAction) -> bool;

    /// Same as [`Authorizer::can`], as a `ServiceResult`.
    fn require(
        &self,
        user: &SessionUser,
        module: &str,
        action: PermissionAction,
    ) -> ServiceResult<()> {
        if self.can(user, module, action) {
            Ok(())
        } else {
            tracing::warn!(
                "Capability {} on {} denied for user {} ({})",
                action,
                module,
                user.id(),
                user.role_name()
            );
            Err(ServiceError::permission_denied(format!(
                "Access denied: {} on {}",
                action, module
            )))
        }
    }
}

/// Answers capability checks from the caller's role permission entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct RolePermissionAuthorizer;

impl Authorizer for RolePermissionAuthorizer {
    fn can(&self, user: &SessionUser, module: &str, action: PermissionAction) -> bool {
        authorize_permission(module, action, user).is_ok()
    }
}

/// Module names used in permission entries.
pub mod modules {
    pub const USERS: &str = "users";
    pub const ROLES: &str = "roles";
    pub const PROJECTS: &str = "projects";
    pub const TASKS: &str = "tasks";
}

/// Role names with workflow meaning.
pub mod roles {
    pub const ADMIN: &str = "admin";
    pub const OWNER: &str = "owner";
    pub const ACCOUNTANT: &str = "accountant";
    pub const SITE_INCHARGE: &str = "site_incharge";
    pub const CONTRACTOR: &str = "contractor";
    pub const CUSTOMER_PURCHASED: &str = "customer_purchased";
}
