//! Error types for the Throttlegate service.

use thiserror::Error;

/// Main error type for Throttlegate operations.
///
/// Request-time decisions never produce one of these; they only surface while
/// loading configuration or running the server.
#[derive(Error, Debug)]
pub enum GateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for GateError {
    fn from(err: ::config::ConfigError) -> Self {
        GateError::Config(err.to_string())
    }
}

/// Result type alias for Throttlegate operations.
pub type Result<T> = std::result::Result<T, GateError>;
