//! Authentication endpoints: login, refresh, logout, registration, and
//! password changes.
//!
//! The refresh token travels exclusively in an HTTP-only cookie; the access
//! token is returned in the body and presented by clients as a bearer
//! header.

use super::{
    jwt::AuthError,
    users::{
        ChangePasswordRequest, LoginRequest, LoginResponse, RefreshResponse, RegisterRequest,
    },
};
use crate::{
    auth::{CurrentUser, OptionalUser},
    AppState,
};
use axum::{extract::State, http::StatusCode, response::Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{json, Value};
use stockify_core::Identity;
use tracing::info;

/// Cookie carrying the refresh token
pub const REFRESH_COOKIE: &str = "refresh_token";

fn refresh_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .http_only(true)
        .secure(!state.config.dev_mode)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::days(state.config.refresh_ttl_days))
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, "")).path("/").build()
}

/// Login endpoint
///
/// Returns the access token and the identity snapshot; sets the refresh
/// cookie as a side effect.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AuthError> {
    let email = request.email.clone();
    let outcome = state.user_service.login(request).await?;

    info!("User logged in: {}", outcome.response.user.id);
    state
        .activity
        .record(Some(&outcome.response.user.id), "LOGIN", &email)
        .await;

    let jar = jar.add(refresh_cookie(&state, outcome.refresh_token));
    Ok((jar, Json(outcome.response)))
}

/// Refresh endpoint
///
/// Reads the refresh cookie and returns a new access token, or 401 when
/// the cookie is absent, invalid, or belongs to a dead epoch.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<RefreshResponse>, AuthError> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AuthError::InvalidToken)?;

    let response = state.user_service.refresh(&token).await?;
    Ok(Json(response))
}

/// Logout endpoint
///
/// Fail-open: the refresh cookie is always cleared and the response is
/// always a success, whether or not a usable bearer token was presented or
/// the revocation write succeeded.
pub async fn logout(
    State(state): State<AppState>,
    OptionalUser(identity): OptionalUser,
    jar: CookieJar,
) -> (CookieJar, Json<Value>) {
    if state.user_service.logout(identity.as_ref()).await {
        if let Some(identity) = &identity {
            state
                .activity
                .record(Some(&identity.id), "LOGOUT", &identity.email)
                .await;
        }
    }

    let jar = jar.remove(removal_cookie());
    (
        jar,
        Json(json!({
            "success": true,
            "message": "Logged out successfully",
        })),
    )
}

/// Registration endpoint
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AuthError> {
    let identity = state.user_service.register(request).await?;

    state
        .activity
        .record(Some(&identity.id), "REGISTER", &identity.email)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": identity,
        })),
    ))
}

/// Current user endpoint; identity comes straight from the bearer token
pub async fn me(CurrentUser(identity): CurrentUser) -> Json<Identity> {
    Json(identity)
}

/// Password change endpoint (authenticated)
///
/// Changing the password advances the token-version epoch, logging the
/// user out everywhere else.
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, AuthError> {
    let user_id: i64 = identity.id.parse().map_err(|_| AuthError::InvalidToken)?;

    state.user_service.change_password(user_id, request).await?;
    state
        .activity
        .record(Some(&identity.id), "CHANGE_PASSWORD", &identity.email)
        .await;

    Ok(Json(json!({
        "message": "Password updated successfully",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_app, state::test_support::test_state};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn test_app() -> axum::Router {
        create_app(test_state().await)
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn register_then_login() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(json_request(
                "/api/auth/register",
                json!({
                    "name": "Test User",
                    "email": "test@example.com",
                    "password": "password123",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(json_request(
                "/api/auth/login",
                json!({"email": "test@example.com", "password": "password123"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.starts_with("refresh_token="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));

        let body = body_json(response).await;
        assert!(body["accessToken"].is_string());
        assert_eq!(body["user"]["email"], "test@example.com");
        assert_eq!(body["user"]["role"], "user");
    }

    #[tokio::test]
    async fn invalid_login_is_a_generic_401() {
        let app = test_app().await;

        let response = app
            .oneshot(json_request(
                "/api/auth/login",
                json!({"email": "nobody@example.com", "password": "whatever"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_credentials");
    }

    #[tokio::test]
    async fn refresh_without_cookie_is_401() {
        let app = test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_without_token_still_succeeds_and_clears_cookie() {
        let app = test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.starts_with("refresh_token="));

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn logout_with_a_garbage_bearer_token_is_still_a_success() {
        let app = test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/logout")
                    .header(header::AUTHORIZATION, "Bearer not-a-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn me_reflects_the_bearer_token() {
        let app = test_app().await;

        let login = app
            .clone()
            .oneshot(json_request(
                "/api/auth/login",
                json!({"email": "admin@stockify.local", "password": "admin123"}),
            ))
            .await
            .unwrap();
        assert_eq!(login.status(), StatusCode::OK);
        let token = body_json(login).await["accessToken"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["email"], "admin@stockify.local");
        assert_eq!(body["role"], "admin");
    }

    #[tokio::test]
    async fn me_without_token_is_401() {
        let app = test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
