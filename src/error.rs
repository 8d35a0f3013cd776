//! Error types for the Fieldguard service.

use thiserror::Error;

/// Main error type for Fieldguard operations.
///
/// A request that exceeds its quota is not an error: it produces a
/// [`Rejection`](crate::ratelimit::Rejection) value instead.
#[derive(Error, Debug)]
pub enum FieldguardError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A limit rule with a zero threshold or an empty window
    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for FieldguardError {
    fn from(err: config::ConfigError) -> Self {
        FieldguardError::Config(err.to_string())
    }
}

/// Result type alias for Fieldguard operations.
pub type Result<T> = std::result::Result<T, FieldguardError>;
