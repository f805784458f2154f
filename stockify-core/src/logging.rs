//! Structured logging setup
//!
//! Configurable tracing output shared by the binaries in the workspace.

use crate::{config_error, StockifyResult};
use serde::{Deserialize, Serialize};
use std::io;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Whether to include file and line information
    pub include_location: bool,
    /// Custom filter directives, e.g. "stockify_web=debug"
    pub filter_directives: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            include_location: false,
            filter_directives: vec![
                "stockify_core=debug".to_string(),
                "stockify_web=debug".to_string(),
                "tower_http=debug".to_string(),
            ],
        }
    }
}

/// Initialize the logging system
///
/// `RUST_LOG` takes precedence: when it is set, the configured level and
/// directives are ignored entirely.
pub fn init_logging(config: &LoggingConfig) -> StockifyResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let mut filter = EnvFilter::new(&config.level);
            for directive in &config.filter_directives {
                let parsed = directive.parse().map_err(|e| {
                    config_error!(format!("Invalid filter directive '{directive}'"), "logging", e)
                })?;
                filter = filter.add_directive(parsed);
            }
            filter
        }
    };

    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_writer(io::stdout),
                )
                .init();
        }
        LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_writer(io::stdout),
                )
                .init();
        }
        LogFormat::Compact => {
            registry
                .with(
                    fmt::layer()
                        .compact()
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_writer(io::stdout),
                )
                .init();
        }
    }

    Ok(())
}
