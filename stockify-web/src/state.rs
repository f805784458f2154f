//! Shared application state
//!
//! Everything handlers need hangs off [`AppState`]: the token service, the
//! user service over the injected SQLite pool, the activity log, and the
//! route guard with its credential resolver chain. The pool is opened by
//! the server (or a test harness) and handed in; nothing here reaches for
//! globals.

use crate::{
    activity::ActivityLog,
    auth::{
        database::SqliteUserStore,
        jwt::TokenService,
        users::UserService,
    },
    middleware::{resolver_chain, CredentialResolver, RouteGuard},
    WebConfig, WebResult,
};
use chrono::Duration;
use sqlx::SqlitePool;
use std::sync::Arc;
use stockify_core::{config_error, storage_error};
use tracing::info;

/// Shared application state, cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub config: WebConfig,
    pub tokens: Arc<TokenService>,
    pub user_service: UserService,
    pub activity: ActivityLog,
    pub guard: Arc<RouteGuard>,
    pub resolvers: Arc<Vec<Box<dyn CredentialResolver>>>,
}

impl AppState {
    /// Build the state over an already-opened pool.
    ///
    /// Runs schema creation and seeds the default admin account, so the
    /// returned state is immediately usable.
    pub async fn new(config: WebConfig, pool: SqlitePool) -> WebResult<Self> {
        let tokens = Arc::new(
            TokenService::new(
                &config.jwt_secret,
                Duration::seconds(config.access_ttl_secs),
                Duration::days(config.refresh_ttl_days),
            )
            .map_err(|message| config_error!(message, "app-state"))?,
        );

        let store = SqliteUserStore::new(pool.clone())
            .await
            .map_err(|e| storage_error!("failed to initialize user store", "app-state", e))?;
        let user_service = UserService::new(store, tokens.clone());

        user_service
            .ensure_default_admin(&config.default_admin_password)
            .await
            .map_err(|e| storage_error!("failed to seed default admin", "app-state", e))?;

        let activity = ActivityLog::new(pool)
            .await
            .map_err(|e| storage_error!("failed to initialize activity log", "app-state", e))?;

        info!("Application state initialized");

        Ok(Self {
            config,
            tokens,
            user_service,
            activity,
            guard: Arc::new(RouteGuard::default()),
            resolvers: Arc::new(resolver_chain()),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::test_state;

    #[tokio::test]
    async fn new_state_seeds_the_default_admin() {
        let state = test_state().await;

        let admin = state
            .user_service
            .store()
            .get_by_email("admin@stockify.local")
            .await
            .unwrap();
        assert!(admin.is_some());
        assert_eq!(admin.unwrap().role, "admin");
    }
}
