//! # Prism Utilities
//!
//! Shared utilities for the Prism workspace: logging set up on `tracing`,
//! written to stderr so it never mixes with rendered values on stdout.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingError, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
