//! Data structures for authentication-related entities.
//!
//! This module defines the login payloads and the authenticated principal
//! attached to each request once its session has been verified.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::database::models::{PermissionEntry, Role, User};

/// Login request payload
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response containing the session token and the sanitized user
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
    pub expires_in: u64, // Token expiration in seconds
}

/// The caller behind a verified session.
///
/// Inserted into request extensions by the session middleware; guards and
/// handlers read it from there.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user: User,
    /// `None` when the user's role reference no longer resolves.
    pub role: Option<Role>,
    pub token: String,
}

impl SessionUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }

    pub fn role_name(&self) -> &str {
        &self.user.role_name
    }

    pub fn permissions(&self) -> &[PermissionEntry] {
        self.role
            .as_ref()
            .map(|role| role.permissions.as_slice())
            .unwrap_or(&[])
    }
}
