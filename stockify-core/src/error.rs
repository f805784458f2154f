//! Unified error handling
//!
//! Structured error types with context and proper error chaining.
//! Configuration errors are fatal at startup; storage errors are runtime
//! faults that surface as internal failures at the HTTP boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

pub type StockifyResult<T> = Result<T, StockifyError>;

/// Error context carried alongside an error for debugging and tracing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for log correlation
    pub error_id: String,
    /// Timestamp when the error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where the error originated
    pub component: String,
    /// Operation being performed when the error occurred
    pub operation: Option<String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for the Stockify system
#[derive(Error, Debug)]
pub enum StockifyError {
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },
}

impl StockifyError {
    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            StockifyError::Config { context, .. } => context,
            StockifyError::Storage { context, .. } => context,
        }
    }

    /// Whether the error is fatal for the process (startup-time errors)
    pub fn is_fatal(&self) -> bool {
        matches!(self, StockifyError::Config { .. })
    }

    /// Log the error with its correlation id
    pub fn log(&self) {
        error!(
            error_id = %self.context().error_id,
            component = %self.context().component,
            error = %self,
            "Error occurred"
        );
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::StockifyError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the environment variables and .env file"),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::StockifyError::Config {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component),
        }
    };
}

#[macro_export]
macro_rules! storage_error {
    ($msg:expr, $component:expr) => {
        $crate::StockifyError::Storage {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::StockifyError::Storage {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component),
        }
    };
}
