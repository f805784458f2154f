//! Stockify Web Server
//!
//! Session/token management and request-boundary access control for the
//! Stockify inventory system.

pub mod activity;
pub mod auth;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use server::StockifyServer;
pub use state::AppState;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the main application router
///
/// The route guard runs in front of every route; public paths are exempted
/// inside the guard itself rather than by router structure.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse::<HeaderValue>().unwrap(),
            "http://127.0.0.1:3000".parse::<HeaderValue>().unwrap(),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_credentials(true)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::route_guard,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable development mode (refresh cookie is not marked secure)
    pub dev_mode: bool,
    /// Database URL
    pub database_url: String,
    /// JWT signing secret
    pub jwt_secret: String,
    /// Access token lifetime in seconds
    pub access_ttl_secs: i64,
    /// Refresh token lifetime in days
    pub refresh_ttl_days: i64,
    /// Password seeded for the default admin account
    pub default_admin_password: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            dev_mode: true,
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "stockify-dev-secret-change-in-production".to_string(),
            access_ttl_secs: 2 * 60 * 60,
            refresh_ttl_days: 30,
            default_admin_password: "admin123".to_string(),
        }
    }
}

impl WebConfig {
    /// Load configuration from environment variables
    ///
    /// The signing secret has no fallback: a deployment without JWT_SECRET
    /// must fail at startup, not issue forgeable tokens.
    pub fn from_env() -> WebResult<Self> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| stockify_core::config_error!("JWT_SECRET must be set", "web-config"))?;

        Ok(Self {
            host: std::env::var("STOCKIFY_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("STOCKIFY_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            dev_mode: std::env::var("STOCKIFY_DEV_MODE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite::memory:".to_string()),
            jwt_secret,
            access_ttl_secs: std::env::var("ACCESS_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2 * 60 * 60),
            refresh_ttl_days: std::env::var("REFRESH_TOKEN_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            default_admin_password: std::env::var("STOCKIFY_ADMIN_PASSWORD")
                .unwrap_or_else(|_| "admin123".to_string()),
        })
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    /// Configuration and storage faults, carried with their context
    #[error(transparent)]
    Core(#[from] stockify_core::StockifyError),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_dev_flavored() {
        let config = WebConfig::default();
        assert!(config.dev_mode);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.access_ttl_secs, 7200);
    }

    #[test]
    fn missing_jwt_secret_is_a_fatal_config_error() {
        std::env::remove_var("JWT_SECRET");
        let err = WebConfig::from_env().unwrap_err();

        let WebError::Core(core) = err else {
            panic!("expected a core error");
        };
        assert!(core.is_fatal());
    }

    #[test]
    fn address_joins_host_and_port() {
        let config = WebConfig {
            host: "0.0.0.0".to_string(),
            port: 9100,
            ..WebConfig::default()
        };
        assert_eq!(config.address(), "0.0.0.0:9100");
    }
}
