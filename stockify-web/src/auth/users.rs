//! Session lifecycle operations
//!
//! Login, refresh, logout, registration, and password changes. Revocation
//! is epoch-based: anything that must kill every outstanding session bumps
//! the user's stored token_version instead of tracking token identities.

use super::{
    database::SqliteUserStore,
    jwt::{AuthError, TokenService},
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stockify_core::{Identity, Role};
use tracing::{debug, info, warn};

/// User login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User registration request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Password change request (authenticated user)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Login response body; the refresh token travels only in the cookie
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub user: Identity,
}

/// Refresh response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Outcome of a successful login: response body plus the refresh token to
/// be set as an HTTP-only cookie by the handler.
#[derive(Debug)]
pub struct LoginOutcome {
    pub response: LoginResponse,
    pub refresh_token: String,
}

/// User service wiring the store and the token signer together
#[derive(Clone)]
pub struct UserService {
    store: SqliteUserStore,
    tokens: Arc<TokenService>,
}

impl UserService {
    pub fn new(store: SqliteUserStore, tokens: Arc<TokenService>) -> Self {
        Self { store, tokens }
    }

    pub fn store(&self) -> &SqliteUserStore {
        &self.store
    }

    /// Authenticate by email/password and issue both tokens.
    ///
    /// Unknown email and wrong password produce the same error so the
    /// endpoint cannot be used to enumerate accounts.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginOutcome, AuthError> {
        if request.email.is_empty() || request.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let user = self
            .store
            .get_by_email(request.email.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash) {
            warn!("Invalid password for {}", request.email);
            return Err(AuthError::InvalidCredentials);
        }

        let identity = user.to_identity()?;
        let access_token = self.tokens.issue_access(&identity)?;
        let refresh_token = self
            .tokens
            .issue_refresh(&identity.id, user.token_version)?;

        debug!("User {} authenticated", identity.id);
        Ok(LoginOutcome {
            response: LoginResponse {
                access_token,
                user: identity,
            },
            refresh_token,
        })
    }

    /// Exchange a refresh token for a fresh access token.
    ///
    /// Honored only while the embedded token_version equals the stored one;
    /// any other value, older or newer, means the token belongs to a dead
    /// epoch and the caller is logged out.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AuthError> {
        let claims = self.tokens.verify_refresh(refresh_token)?;

        let user_id: i64 = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;
        let user = self
            .store
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if user.token_version != claims.token_version {
            debug!(
                "Refresh token for user {} carries epoch {}, store has {}",
                user_id, claims.token_version, user.token_version
            );
            return Err(AuthError::InvalidToken);
        }

        let identity = user.to_identity()?;
        let access_token = self.tokens.issue_access(&identity)?;

        Ok(RefreshResponse { access_token })
    }

    /// Best-effort revocation for logout.
    ///
    /// Fail-open by contract: an unresolved caller or a store failure must
    /// not prevent the client-side session from being cleared, so this
    /// never returns an error. Returns whether the epoch was advanced.
    pub async fn logout(&self, identity: Option<&Identity>) -> bool {
        let Some(identity) = identity else {
            return false;
        };

        match identity.id.parse::<i64>() {
            Ok(user_id) => match self.store.bump_token_version(user_id).await {
                Ok(()) => {
                    info!("Sessions revoked for user {}", user_id);
                    true
                }
                Err(e) => {
                    warn!("Failed to revoke sessions for user {}: {}", user_id, e);
                    false
                }
            },
            Err(_) => {
                warn!("Logout identity carries non-numeric id");
                false
            }
        }
    }

    /// Register a new user account with the default role
    pub async fn register(&self, request: RegisterRequest) -> Result<Identity, AuthError> {
        if request.name.trim().is_empty()
            || request.email.trim().is_empty()
            || request.password.is_empty()
        {
            return Err(AuthError::MissingCredentials);
        }

        validate_password(&request.password)?;

        let password_hash = hash_password(&request.password)?;
        let image_url = format!(
            "https://ui-avatars.com/api/?name={}",
            request.name.trim().replace(' ', "+")
        );

        let id = self
            .store
            .insert(
                request.name.trim(),
                request.email.trim(),
                &password_hash,
                Some(&image_url),
                Role::User,
            )
            .await?;

        info!("Registered new user {}", id);
        self.store
            .get_by_id(id)
            .await?
            .ok_or(AuthError::Storage("user vanished after insert".to_string()))?
            .to_identity()
    }

    /// Change the caller's own password.
    ///
    /// The store bumps token_version together with the hash, so every
    /// refresh token issued before the change stops working.
    pub async fn change_password(
        &self,
        user_id: i64,
        request: ChangePasswordRequest,
    ) -> Result<(), AuthError> {
        validate_password(&request.new_password)?;

        let user = self
            .store
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !verify_password(&request.current_password, &user.password_hash) {
            return Err(AuthError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        let new_hash = hash_password(&request.new_password)?;
        self.store.update_password(user_id, &new_hash).await?;

        info!("Password changed for user {}", user_id);
        Ok(())
    }

    /// Admin override: set a user's password and revoke their sessions
    pub async fn admin_set_password(
        &self,
        user_id: i64,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validate_password(new_password)?;

        if self.store.get_by_id(user_id).await?.is_none() {
            return Err(AuthError::Validation("Unknown user".to_string()));
        }

        let new_hash = hash_password(new_password)?;
        self.store.update_password(user_id, &new_hash).await?;

        info!("Password reset for user {} by admin", user_id);
        Ok(())
    }

    /// Seed the default admin account on first run
    pub async fn ensure_default_admin(&self, password: &str) -> Result<(), AuthError> {
        let hash = hash_password(password)?;
        self.store.ensure_default_admin(&hash).await
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < 6 {
        return Err(AuthError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

/// Hash a password with Argon2id and a fresh random salt
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            warn!("Failed to hash password: {}", e);
            AuthError::TokenCreation
        })
}

/// Verify a password against a stored Argon2 hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
