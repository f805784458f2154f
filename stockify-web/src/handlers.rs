//! Operational and admin HTTP handlers.

use crate::{
    activity::ActivityEntry,
    auth::{
        jwt::AuthError,
        AdminUser, ManagerUser,
    },
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

/// Health check endpoint; pings the database
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = match sqlx::query("SELECT 1")
        .execute(state.user_service.store().pool())
        .await
    {
        Ok(_) => "ok",
        Err(_) => "unavailable",
    };

    let status = if database == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if database == "ok" { "healthy" } else { "degraded" },
            "database": database,
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// First-run setup: ensures the schema and the default admin account exist.
/// Idempotent, safe to call repeatedly.
pub async fn setup(State(state): State<AppState>) -> Result<Json<Value>, AuthError> {
    state
        .user_service
        .ensure_default_admin(&state.config.default_admin_password)
        .await?;

    info!("Setup completed");
    Ok(Json(json!({
        "message": "Setup completed",
        "defaultAdminEmail": "admin@stockify.local",
    })))
}

/// Admin view of one account; never includes the password hash
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub image_url: Option<String>,
    pub created_at: String,
}

/// List all accounts (admin only)
pub async fn admin_list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Vec<UserSummary>>, AuthError> {
    let users = state.user_service.store().list().await?;

    Ok(Json(
        users
            .into_iter()
            .map(|u| UserSummary {
                id: u.id,
                name: u.name,
                email: u.email,
                role: u.role,
                image_url: u.image_url,
                created_at: u.created_at,
            })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPasswordRequest {
    pub new_password: String,
}

/// Overwrite an account password (admin only); revokes that account's
/// outstanding refresh tokens as a side effect.
pub async fn admin_set_password(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<i64>,
    Json(request): Json<SetPasswordRequest>,
) -> Result<Json<Value>, AuthError> {
    state
        .user_service
        .admin_set_password(user_id, &request.new_password)
        .await?;

    info!("Admin {} reset password for user {}", admin.id, user_id);
    state
        .activity
        .record(Some(&admin.id), "ADMIN_SET_PASSWORD", &user_id.to_string())
        .await;

    Ok(Json(json!({
        "message": "Password updated successfully",
    })))
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

/// Recent account activity (manager and above)
pub async fn recent_activity(
    State(state): State<AppState>,
    ManagerUser(_manager): ManagerUser,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<ActivityEntry>>, AuthError> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let entries = state
        .activity
        .recent(limit)
        .await
        .map_err(|e| AuthError::Storage(e.to_string()))?;

    Ok(Json(entries))
}
