//! Stockify Web Server
//!
//! Main web server implementation using Axum. The server owns the SQLite
//! pool: it is opened here, injected into the application state, and
//! closed after the listener winds down.

use crate::{create_app, AppState, WebConfig, WebError, WebResult};
use axum::serve;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Main Stockify web server
pub struct StockifyServer {
    config: WebConfig,
    state: AppState,
    pool: SqlitePool,
}

impl std::fmt::Debug for StockifyServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockifyServer")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl StockifyServer {
    /// Create a new Stockify server
    ///
    /// Opens the database pool and initializes the application state.
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let pool = open_pool(&config.database_url).await?;
        let state = AppState::new(config.clone(), pool.clone()).await?;

        Ok(Self {
            config,
            state,
            pool,
        })
    }

    /// Start the web server
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.address();

        info!("🚀 Starting Stockify Web Server");
        info!("📍 Server address: http://{}", address);
        info!("🔧 Development mode: {}", self.config.dev_mode);

        let app = create_app(self.state.clone());

        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("✅ Server listening on http://{}", address);

        let result = serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        // Flush outstanding writes before the process exits
        self.pool.close().await;
        info!("Database pool closed");

        if let Err(e) = result {
            error!("❌ Server error: {}", e);
            return Err(WebError::Server(e));
        }

        Ok(())
    }

    /// Get server configuration
    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Open the SQLite pool for the given URL.
///
/// In-memory databases get a single connection; every connection to an
/// in-memory SQLite URL is a separate database.
async fn open_pool(database_url: &str) -> WebResult<SqlitePool> {
    let max_connections = if database_url.contains(":memory:") {
        1
    } else {
        5
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| stockify_core::storage_error!("failed to open database pool", "server", e))?;

    Ok(pool)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install shutdown handler: {}", e);
    }
    info!("Shutdown signal received");
}

/// Builder for StockifyServer
pub struct StockifyServerBuilder {
    config: WebConfig,
}

impl StockifyServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self {
            config: WebConfig::default(),
        }
    }

    /// Set the server host
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Enable development mode
    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.config.dev_mode = dev_mode;
        self
    }

    /// Set database URL
    pub fn database_url<S: Into<String>>(mut self, database_url: S) -> Self {
        self.config.database_url = database_url.into();
        self
    }

    /// Set the JWT signing secret
    pub fn jwt_secret<S: Into<String>>(mut self, jwt_secret: S) -> Self {
        self.config.jwt_secret = jwt_secret.into();
        self
    }

    /// Build the server
    pub async fn build(self) -> WebResult<StockifyServer> {
        StockifyServer::new(self.config).await
    }
}

impl Default for StockifyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockify_core::{Identity, Role};

    #[tokio::test]
    async fn server_creation_with_defaults() {
        let config = WebConfig::default();
        let server = StockifyServer::new(config).await;
        assert!(server.is_ok());
    }

    #[tokio::test]
    async fn empty_secret_fails_at_construction() {
        let config = WebConfig {
            jwt_secret: String::new(),
            ..WebConfig::default()
        };
        let err = StockifyServer::new(config).await.unwrap_err();

        // Startup-time misconfiguration must be classified as fatal.
        let WebError::Core(core) = err else {
            panic!("expected a core error");
        };
        assert!(core.is_fatal());
    }

    #[tokio::test]
    async fn server_honors_the_configured_access_ttl() {
        let config = WebConfig {
            access_ttl_secs: 100,
            ..WebConfig::default()
        };
        let server = StockifyServer::new(config).await.unwrap();

        let identity = Identity {
            id: "1".to_string(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            role: Role::User,
            image: None,
        };
        let token = server.state().tokens.issue_access(&identity).unwrap();
        let claims = server.state().tokens.verify_access(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 100);
    }

    #[test]
    fn server_builder_sets_fields() {
        let builder = StockifyServerBuilder::new()
            .host("localhost")
            .port(3000)
            .dev_mode(true)
            .database_url("sqlite::memory:");

        assert_eq!(builder.config.host, "localhost");
        assert_eq!(builder.config.port, 3000);
        assert!(builder.config.dev_mode);
    }
}
