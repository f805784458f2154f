//! Stockify Core - shared foundation for the Stockify services
//!
//! Defines the unified error type, logging setup, and the identity/role
//! model used across the workspace.

pub mod error;
pub mod logging;
pub mod types;

pub use error::*;
pub use logging::*;
pub use types::*;

// Re-export commonly used external types
pub use tracing;
