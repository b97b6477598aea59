//! Role business logic service.
//!
//! Role names are stored trimmed and lowercased. Uniqueness is checked
//! case-insensitively before every create or rename; the UNIQUE index on
//! `roles.name` catches writers that race past the check.

use crate::database::models::{
    CreateRoleRequest, PermissionEntry, Role, RoleWithUserCount, UpdateRoleRequest,
    UpsertRolePermissionsRequest,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::role_repository::RoleRepository;
use sqlx::SqlitePool;
use validator::Validate;

pub struct RoleService<'a> {
    pool: &'a SqlitePool,
}

/// Canonical form of a role name.
pub fn normalize_role_name(name: &str) -> String {
    name.trim().to_lowercase()
}

impl<'a> RoleService<'a> {
    /// Creates a new RoleService instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    fn repo(&self) -> RoleRepository<'a> {
        RoleRepository::new(self.pool)
    }

    /// Creates a role.
    ///
    /// # Errors
    /// - `Validation` for an empty name
    /// - `AlreadyExists` if the name is taken, ignoring case
    pub async fn create_role(&self, request: CreateRoleRequest) -> ServiceResult<Role> {
        request
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        let name = normalize_role_name(&request.name);
        if name.is_empty() {
            return Err(ServiceError::validation("name: Role name is required"));
        }

        let repo = self.repo();
        if repo.name_taken(&name, None).await? {
            return Err(ServiceError::already_exists("Role", &name));
        }

        let role = repo
            .create_role(&name, &request.description, &request.color, &request.permissions)
            .await
            .map_err(|e| ServiceError::from_insert_error(e, "Role", &name))?;

        tracing::info!("Created role {}", role.name);
        Ok(role)
    }

    /// Updates the provided fields of a role. A rename must not collide with
    /// any other role.
    pub async fn update_role(&self, id: &str, request: UpdateRoleRequest) -> ServiceResult<Role> {
        request
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        let repo = self.repo();
        let name = request.name.as_deref().map(normalize_role_name);

        if let Some(name) = &name {
            if name.is_empty() {
                return Err(ServiceError::validation("name: Role name cannot be empty"));
            }
            if repo.name_taken(name, Some(id)).await? {
                return Err(ServiceError::already_exists("Role", name));
            }
        }

        let role = repo
            .update_role(
                id,
                name.as_deref(),
                request.description.as_deref(),
                request.color.as_deref(),
                request.permissions.as_deref(),
            )
            .await
            .map_err(|e| {
                ServiceError::from_insert_error(e, "Role", name.clone().unwrap_or_default())
            })?
            .ok_or_else(|| ServiceError::not_found("Role", id))?;

        tracing::info!("Updated role {}", role.name);
        Ok(role)
    }

    /// Creates the role named `name` with `permissions`, or replaces the
    /// permissions of the existing one.
    pub async fn upsert_permissions(
        &self,
        request: UpsertRolePermissionsRequest,
    ) -> ServiceResult<Role> {
        request
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        let normalized = normalize_role_name(&request.name);
        let permissions = request.permissions;

        match self.repo().get_role_by_name(&normalized).await? {
            Some(role) => {
                self.update_role(
                    &role.id,
                    UpdateRoleRequest {
                        permissions: Some(permissions),
                        ..Default::default()
                    },
                )
                .await
            }
            None => {
                self.create_role(CreateRoleRequest {
                    name: normalized,
                    description: String::new(),
                    color: String::new(),
                    permissions,
                })
                .await
            }
        }
    }

    /// Blanks the description and color of a role.
    pub async fn clear_meta(&self, id: &str) -> ServiceResult<Role> {
        self.update_role(
            id,
            UpdateRoleRequest {
                description: Some(String::new()),
                color: Some(String::new()),
                ..Default::default()
            },
        )
        .await
    }

    /// Empties the permission list of a role.
    pub async fn reset_permissions(&self, id: &str) -> ServiceResult<Role> {
        self.update_role(
            id,
            UpdateRoleRequest {
                permissions: Some(Vec::new()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn delete_role(&self, id: &str) -> ServiceResult<()> {
        if !self.repo().delete_role(id).await? {
            return Err(ServiceError::not_found("Role", id));
        }

        tracing::info!("Deleted role {}", id);
        Ok(())
    }

    pub async fn list_roles(&self) -> ServiceResult<Vec<Role>> {
        Ok(self.repo().get_all_roles().await?)
    }

    pub async fn list_with_user_count(&self) -> ServiceResult<Vec<RoleWithUserCount>> {
        Ok(self.repo().get_roles_with_user_count().await?)
    }

    /// Permission entries of the role named `name`.
    pub async fn permissions_by_name(&self, name: &str) -> ServiceResult<Vec<PermissionEntry>> {
        let normalized = normalize_role_name(name);
        let role = self
            .repo()
            .get_role_by_name(&normalized)
            .await?
            .ok_or_else(|| ServiceError::not_found("Role", &normalized))?;

        Ok(role.permissions)
    }
}
