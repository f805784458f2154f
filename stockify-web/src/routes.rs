//! API route definitions

use crate::{auth, handlers, AppState};
use axum::{
    routing::{get, post, put},
    Router,
};

/// All API routes, mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Operational
        .route("/health", get(handlers::health_check))
        .route("/setup", post(handlers::setup))
        // Session lifecycle
        .route("/auth/login", post(auth::handlers::login))
        .route("/auth/register", post(auth::handlers::register))
        .route("/auth/refresh", get(auth::handlers::refresh))
        .route("/auth/logout", post(auth::handlers::logout))
        .route("/auth/me", get(auth::handlers::me))
        // Account management
        .route("/users/change-password", post(auth::handlers::change_password))
        // Admin
        .route("/admin/users", get(handlers::admin_list_users))
        .route(
            "/admin/users/{id}/password",
            put(handlers::admin_set_password),
        )
        // Reporting
        .route("/reports/recent", get(handlers::recent_activity))
}
