//! JWT issuance and verification
//!
//! Access tokens carry a full identity snapshot; refresh tokens carry only
//! the user id and the token-version epoch. Verification failures are a
//! routine outcome, never a propagated fault, so every decode problem
//! (expired, malformed, bad signature, wrong token type) collapses into
//! `AuthError::InvalidToken`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use stockify_core::{Identity, Role};
use tracing::{debug, warn};

/// Token type discriminant embedded in every claim set
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims of a short-lived access token: full identity snapshot plus expiry
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject (user id)
    pub sub: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
    pub token_type: TokenType,
}

impl AccessClaims {
    /// Rebuild the identity snapshot embedded at issuance
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.sub.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            image: self.image.clone(),
        }
    }
}

/// Claims of a long-lived refresh token: user id and token-version epoch only
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    /// Subject (user id)
    pub sub: String,
    /// Epoch counter; must match the stored version to be honored
    pub token_version: i64,
    pub iat: i64,
    pub exp: i64,
    pub token_type: TokenType,
}

/// Authentication errors mapped to HTTP responses
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// One generic message for bad password and unknown email alike
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing credentials")]
    MissingCredentials,
    #[error("Token creation failed")]
    TokenCreation,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Missing authorization header")]
    MissingAuthHeader,
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "Invalid email or password".to_string(),
            ),
            AuthError::MissingCredentials => (
                StatusCode::BAD_REQUEST,
                "missing_credentials",
                "Email and password are required".to_string(),
            ),
            AuthError::TokenCreation => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "token_creation_failed",
                "Failed to create authentication token".to_string(),
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Invalid or expired token".to_string(),
            ),
            AuthError::MissingAuthHeader => (
                StatusCode::UNAUTHORIZED,
                "missing_auth_header",
                "Authorization header is required".to_string(),
            ),
            AuthError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_failed", msg.clone())
            }
            AuthError::Storage(_) => {
                warn!(error = %self, "Store failure surfaced to client");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_failure",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Signing and verification service, built once from configuration.
///
/// Construction fails when the secret is empty; a deployment without a
/// signing secret must not start.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Result<Self, String> {
        if secret.is_empty() {
            return Err("JWT signing secret is empty".to_string());
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        })
    }

    /// Issue an access token embedding the full identity snapshot
    pub fn issue_access(&self, identity: &Identity) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: identity.id.clone(),
            name: identity.name.clone(),
            email: identity.email.clone(),
            role: identity.role,
            image: identity.image.clone(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
            token_type: TokenType::Access,
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            warn!("Failed to encode access token: {}", e);
            AuthError::TokenCreation
        })
    }

    /// Issue a refresh token bound to the user's current token-version epoch
    pub fn issue_refresh(&self, user_id: &str, token_version: i64) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            token_version,
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
            token_type: TokenType::Refresh,
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            warn!("Failed to encode refresh token: {}", e);
            AuthError::TokenCreation
        })
    }

    /// Verify an access token: signature, expiry, and token type
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let data = decode::<AccessClaims>(token, &self.decoding, &Validation::default())
            .map_err(|e| {
                debug!("Access token verification failed: {}", e);
                AuthError::InvalidToken
            })?;

        if data.claims.token_type != TokenType::Access {
            return Err(AuthError::InvalidToken);
        }

        Ok(data.claims)
    }

    /// Verify a refresh token: signature, expiry, and token type
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        let data = decode::<RefreshClaims>(token, &self.decoding, &Validation::default())
            .map_err(|e| {
                debug!("Refresh token verification failed: {}", e);
                AuthError::InvalidToken
            })?;

        if data.claims.token_type != TokenType::Refresh {
            return Err(AuthError::InvalidToken);
        }

        Ok(data.claims)
    }
}
