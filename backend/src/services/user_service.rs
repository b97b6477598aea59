//! User business logic service.
//!
//! Handles account administration: creation, profile and status changes,
//! password resets and deletion. Any change that should lock a user out
//! also ends their live session.

use crate::api::common::PaginationFilter;
use crate::auth::guard::roles;
use crate::auth::service::{end_user_session, hash_password};
use crate::config::BootstrapAdmin;
use crate::database::models::{
    CreateUser, CreateUserRequest, ResetPasswordRequest, UpdateUserRequest, User, UserStatus,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::role_repository::RoleRepository;
use crate::repositories::user_repository::UserRepository;
use crate::state::AppState;
use sqlx::SqlitePool;
use validator::Validate;

pub struct UserService<'a> {
    state: &'a AppState,
}

impl<'a> UserService<'a> {
    /// Creates a new UserService instance.
    ///
    /// # Arguments
    /// * `state` - Shared application state (pool, revocation store, config)
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn repo(&self) -> UserRepository<'_> {
        UserRepository::new(&self.state.pool)
    }

    /// Creates a new user with full validation.
    ///
    /// # Arguments
    /// * `request` - User creation payload
    ///
    /// # Returns
    /// The newly created User with all fields populated
    ///
    /// # Errors
    /// Returns `ServiceError` for:
    /// - Validation failures
    /// - Duplicate email (`AlreadyExists`)
    /// - Unknown role name (`NotFound`)
    pub async fn create_user(&self, request: CreateUserRequest) -> ServiceResult<User> {
        request
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        let email = request.email.trim().to_lowercase();
        let repo = self.repo();

        if repo.email_exists(&email).await? {
            return Err(ServiceError::already_exists("User", &email));
        }

        let role_name = request.role_name.trim().to_lowercase();
        let role = RoleRepository::new(&self.state.pool)
            .get_role_by_name(&role_name)
            .await?
            .ok_or_else(|| ServiceError::not_found("Role", &role_name))?;

        let password_hash = hash_password(&request.password, self.state.config.bcrypt_cost)?;

        let data = CreateUser {
            name: request.name.trim().to_string(),
            email: email.clone(),
            password_hash,
            role_name: role.name,
            role_id: Some(role.id),
            status: request.status.unwrap_or(UserStatus::Active),
            phone: request.phone.unwrap_or_default(),
            company: request.company.unwrap_or_default(),
            specialization: request.specialization.unwrap_or_default(),
        };

        let user = repo
            .create_user(data)
            .await
            .map_err(|e| ServiceError::from_insert_error(e, "User", &email))?;

        tracing::info!("Created user {} with role {}", user.id, user.role_name);
        Ok(user)
    }

    /// Retrieves a user by ID with existence verification.
    ///
    /// # Errors
    /// Returns `ServiceError::NotFound` if user doesn't exist
    pub async fn get_user_required(&self, id: &str) -> ServiceResult<User> {
        let user = self
            .repo()
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))?;
        Ok(user)
    }

    /// Lists one page of users, leaving out the caller.
    pub async fn list_users(
        &self,
        caller_id: &str,
        pagination: &PaginationFilter,
    ) -> ServiceResult<(Vec<User>, u64)> {
        pagination
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        Ok(self.repo().list_users_excluding(caller_id, pagination).await?)
    }

    pub async fn list_by_role(&self, role_name: &str) -> ServiceResult<Vec<User>> {
        let role_name = role_name.trim().to_lowercase();
        Ok(self.repo().get_users_by_role_name(&role_name).await?)
    }

    pub async fn update_profile(&self, id: &str, update: UpdateUserRequest) -> ServiceResult<User> {
        update
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        self.repo()
            .update_profile(id, &update)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))
    }

    /// Activates or deactivates an account. Deactivation ends the user's
    /// live session.
    ///
    /// # Errors
    /// - `Validation` for any status other than `active`/`inactive`
    /// - `NotFound` if the user does not exist
    pub async fn update_status(&self, id: &str, status: UserStatus) -> ServiceResult<User> {
        if !matches!(status, UserStatus::Active | UserStatus::Inactive) {
            return Err(ServiceError::validation(
                "Status must be 'active' or 'inactive'",
            ));
        }

        let user = self
            .repo()
            .update_status(id, status)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))?;

        if !user.is_active() {
            end_user_session(&self.state.pool, self.state.revocations.as_ref(), id).await?;
        }

        tracing::info!("User {} status set to {}", id, status);
        Ok(user)
    }

    /// Replaces a user's password and ends their live session.
    pub async fn reset_password(&self, id: &str, request: ResetPasswordRequest) -> ServiceResult<()> {
        request
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        let password_hash = hash_password(&request.password, self.state.config.bcrypt_cost)?;

        if !self.repo().update_password(id, &password_hash).await? {
            return Err(ServiceError::not_found("User", id));
        }

        end_user_session(&self.state.pool, self.state.revocations.as_ref(), id).await?;
        tracing::info!("Password reset for user {}", id);
        Ok(())
    }

    /// Deletes a user after ending their live session. References held by
    /// projects and tasks are left as they are.
    pub async fn delete_user(&self, id: &str) -> ServiceResult<()> {
        end_user_session(&self.state.pool, self.state.revocations.as_ref(), id).await?;

        if !self.repo().delete_user(id).await? {
            return Err(ServiceError::not_found("User", id));
        }

        tracing::info!("Deleted user {}", id);
        Ok(())
    }

    /// Creates the configured administrator unless that email is already
    /// registered.
    ///
    /// # Returns
    /// `true` if a user was created
    pub async fn ensure_bootstrap_admin(&self, admin: &BootstrapAdmin) -> ServiceResult<bool> {
        let email = admin.email.trim().to_lowercase();
        if self.repo().email_exists(&email).await? {
            return Ok(false);
        }

        self.create_user(CreateUserRequest {
            name: admin.name.clone(),
            email,
            password: admin.password.clone(),
            role_name: roles::ADMIN.to_string(),
            status: Some(UserStatus::Active),
            phone: None,
            company: None,
            specialization: None,
        })
        .await?;

        tracing::info!("Bootstrap administrator created");
        Ok(true)
    }
}

/// Loads a user that must hold `role`. A user with another role is reported
/// as a missing `entity`, so a stray id never binds the wrong kind of user.
pub(crate) async fn user_in_role(
    pool: &SqlitePool,
    user_id: &str,
    role: &str,
    entity: &str,
) -> ServiceResult<User> {
    match UserRepository::new(pool).get_user_by_id(user_id).await? {
        Some(user) if user.role_name == role => Ok(user),
        Some(user) => {
            tracing::warn!(
                "User {} has role '{}' where '{}' was expected",
                user.id,
                user.role_name,
                role
            );
            Err(ServiceError::not_found(entity, user_id))
        }
        None => Err(ServiceError::not_found(entity, user_id)),
    }
}

/// [`user_in_role`] for contractors.
pub(crate) async fn contractor_required(pool: &SqlitePool, user_id: &str) -> ServiceResult<User> {
    user_in_role(pool, user_id, roles::CONTRACTOR, "Contractor").await
}

/// [`user_in_role`] for site incharges.
pub(crate) async fn site_incharge_required(
    pool: &SqlitePool,
    user_id: &str,
) -> ServiceResult<User> {
    user_in_role(pool, user_id, roles::SITE_INCHARGE, "Site incharge").await
}
