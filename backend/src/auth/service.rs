//! Core business logic for the authentication system.
//!
//! Issues, verifies and revokes session tokens. A user has at most one live
//! token: logging in swaps the stored token with a compare-and-set update and
//! revokes whatever it replaced, so concurrent logins for the same account
//! serialise and only the last one survives.

use crate::auth::errors::AuthError;
use crate::auth::models::{LoginRequest, LoginResponse, SessionUser};
use crate::auth::revocation::RevocationStore;
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::role_repository::RoleRepository;
use crate::repositories::user_repository::UserRepository;
use crate::state::AppState;
use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

/// Upper bound on compare-and-set retries when logins race.
const MAX_SWAP_ATTEMPTS: usize = 8;

/// Authentication service for handling login, session verification and logout
pub struct AuthService<'a> {
    state: &'a AppState,
}

impl<'a> AuthService<'a> {
    /// Create a new AuthService instance
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Authenticates `email`/`password` and opens a new session, revoking
    /// the user's previous one.
    ///
    /// # Errors
    /// - `AuthError::InvalidCredentials` for an unknown email or wrong password
    /// - `AuthError::AccountInactive` for inactive or suspended accounts
    pub async fn issue_session(&self, login_request: LoginRequest) -> ServiceResult<LoginResponse> {
        login_request
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        let email = login_request.email.trim().to_lowercase();
        let repo = UserRepository::new(&self.state.pool);

        let Some(mut user) = repo.get_user_by_email(&email).await? else {
            tracing::warn!("Login failed: unknown email");
            return Err(AuthError::InvalidCredentials.into());
        };

        if !verify_password(&login_request.password, &user.password_hash) {
            tracing::warn!("Login failed: wrong password for user {}", user.id);
            return Err(AuthError::InvalidCredentials.into());
        }

        if !user.is_active() {
            tracing::warn!("Login refused: user {} is {}", user.id, user.status);
            return Err(AuthError::AccountInactive.into());
        }

        let token = self.state.jwt.generate_token(&user.id, &user.role_name)?;
        let now = Utc::now();

        for _ in 0..MAX_SWAP_ATTEMPTS {
            let previous = user.current_session_token.clone();

            if repo
                .swap_session_token(&user.id, previous.as_deref(), Some(&token), Some(now))
                .await?
            {
                if let Some(previous) = previous {
                    self.state.revocations.revoke(&previous).await?;
                    tracing::info!("Revoked previous session of user {}", user.id);
                }

                user.current_session_token = Some(token.clone());
                user.last_login = Some(now);
                tracing::info!("User {} logged in", user.id);

                return Ok(LoginResponse {
                    token,
                    user,
                    expires_in: self.state.jwt.expires_in_seconds(),
                });
            }

            tracing::debug!("Concurrent login for user {}, retrying swap", user.id);
            user = repo
                .get_user_by_id(&user.id)
                .await?
                .ok_or(AuthError::InvalidCredentials)?;
        }

        Err(ServiceError::invalid_operation(
            "Too many concurrent logins for this account, try again",
        ))
    }

    /// Resolves a presented token to the user behind it.
    ///
    /// # Errors
    /// `NoToken`, `Revoked`, `Expired`, `Malformed`, `UserNotFound` or
    /// `AccountInactive`
    pub async fn verify_session(&self, token: Option<&str>) -> ServiceResult<SessionUser> {
        let token = token
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::NoToken)?;

        if self.state.revocations.is_revoked(token).await? {
            return Err(AuthError::Revoked.into());
        }

        let claims = self.state.jwt.validate_token(token)?;

        let user = UserRepository::new(&self.state.pool)
            .get_user_by_id(claims.user_id())
            .await?
            .ok_or(AuthError::UserNotFound)?;

        // A token that is no longer the user's current one was superseded,
        // even if the revocation set has since been lost.
        if user.current_session_token.as_deref() != Some(token) {
            return Err(AuthError::Revoked.into());
        }

        if !user.is_active() {
            return Err(AuthError::AccountInactive.into());
        }

        let role_repo = RoleRepository::new(&self.state.pool);
        let role = match &user.role_id {
            Some(role_id) => role_repo.get_role_by_id(role_id).await?,
            None => None,
        };
        let role = match role {
            Some(role) => Some(role),
            None => role_repo.get_role_by_name(&user.role_name).await?,
        };

        Ok(SessionUser {
            user,
            role,
            token: token.to_string(),
        })
    }

    /// Revokes `token` and clears it from its user if it is still current.
    /// Revoking an already revoked token is a no-op.
    pub async fn revoke_session(&self, token: &str) -> ServiceResult<()> {
        let newly_revoked = self.state.revocations.revoke(token).await?;

        if let Ok(claims) = self.state.jwt.validate_token(token) {
            UserRepository::new(&self.state.pool)
                .swap_session_token(claims.user_id(), Some(token), None, None)
                .await?;
        }

        if newly_revoked {
            tracing::info!("Session revoked");
        }

        Ok(())
    }
}

/// Ends whatever session `user_id` currently holds. Used when an account is
/// deactivated, has its password reset or is deleted.
pub async fn end_user_session(
    pool: &SqlitePool,
    revocations: &dyn RevocationStore,
    user_id: &str,
) -> ServiceResult<()> {
    let repo = UserRepository::new(pool);

    for _ in 0..MAX_SWAP_ATTEMPTS {
        let Some(user) = repo.get_user_by_id(user_id).await? else {
            return Ok(());
        };
        let Some(token) = user.current_session_token else {
            return Ok(());
        };

        if repo
            .swap_session_token(user_id, Some(&token), None, None)
            .await?
        {
            revocations.revoke(&token).await?;
            tracing::info!("Ended live session of user {}", user_id);
            return Ok(());
        }
    }

    Err(ServiceError::invalid_operation(
        "Session changed concurrently, try again",
    ))
}

/// Hashes a password with the configured bcrypt cost.
pub fn hash_password(password: &str, cost: u32) -> ServiceResult<String> {
    bcrypt::hash(password, cost)
        .map_err(|e| ServiceError::internal_error(format!("Password hashing failed: {}", e)))
}

/// Checks `password` against a stored bcrypt hash. A corrupt hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::error!("Password verification error: {}", e);
            false
        }
    }
}
