//! Authentication and authorization
//!
//! Token issuance/verification lives in [`jwt`], the user store in
//! [`database`], the session operations in [`users`], and the HTTP
//! endpoints in [`handlers`]. This module provides the request extractors
//! handlers use to obtain the authenticated identity.

pub mod database;
pub mod handlers;
pub mod jwt;
pub mod users;


use crate::AppState;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
};
use jwt::AuthError;
use stockify_core::Identity;
use tracing::warn;

/// Extract the authenticated identity from a request.
///
/// The route guard stores the resolved identity in the request extensions;
/// public-prefixed routes (such as `/api/auth/me`) are not guarded, so the
/// extractor also accepts a bearer token directly.
pub struct CurrentUser(pub Identity);

impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(CurrentUser(identity.clone()));
        }

        let app_state = AppState::from_ref(state);
        let auth = parts
            .headers
            .get("authorization")
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidToken)?;

        let token = auth
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?;

        let claims = app_state.tokens.verify_access(token)?;
        Ok(CurrentUser(claims.identity()))
    }
}

/// Optional identity extractor; never rejects
pub struct OptionalUser(pub Option<Identity>);

impl<S> FromRequestParts<S> for OptionalUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalUser(
            CurrentUser::from_request_parts(parts, state)
                .await
                .ok()
                .map(|CurrentUser(identity)| identity),
        ))
    }
}

/// Role check failure with a structured 403 body
#[derive(Debug)]
pub struct PermissionDenied {
    pub required_role: &'static str,
    pub user_id: String,
}

impl IntoResponse for PermissionDenied {
    fn into_response(self) -> Response {
        (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({
                "error": "permission_denied",
                "message": format!(
                    "User '{}' does not have the required role: {}",
                    self.user_id, self.required_role
                ),
                "required_role": self.required_role,
            })),
        )
            .into_response()
    }
}

/// Admin-only extractor
pub struct AdminUser(pub Identity);

impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state)
            .await
            .map_err(|e| e.into_response())?;

        if identity.role.is_admin() {
            Ok(AdminUser(identity))
        } else {
            warn!("Admin access required but user {} has role {}", identity.id, identity.role);
            Err(PermissionDenied {
                required_role: "admin",
                user_id: identity.id,
            }
            .into_response())
        }
    }
}

/// Manager-tooling extractor; accepts admin and manager roles
pub struct ManagerUser(pub Identity);

impl<S> FromRequestParts<S> for ManagerUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state)
            .await
            .map_err(|e| e.into_response())?;

        if identity.role.is_manager() {
            Ok(ManagerUser(identity))
        } else {
            warn!(
                "Manager access required but user {} has role {}",
                identity.id, identity.role
            );
            Err(PermissionDenied {
                required_role: "manager",
                user_id: identity.id,
            }
            .into_response())
        }
    }
}
