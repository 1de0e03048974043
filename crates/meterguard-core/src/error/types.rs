//! Core error types and traits for Meterguard

use thiserror::Error;

/// Result type alias for Meterguard operations
pub type MeterResult<T> = Result<T, MeterError>;

/// Unified error trait that all Meterguard errors implement.
///
/// - error_code(): Stable code for programmatic error identification
/// - message(): Human-readable error message
/// - status_code(): HTTP status a service boundary should answer with
pub trait UnifiedError: std::error::Error + Send + Sync {
    /// Get the error code for programmatic handling
    fn error_code(&self) -> &str;

    /// Get the human-readable error message
    fn message(&self) -> &str;

    /// Get optional context about the error
    fn context(&self) -> Option<&str> {
        None
    }

    /// HTTP status code used when surfacing this error to end users
    fn status_code(&self) -> u16 {
        500
    }

    /// Check if a later attempt might succeed
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Main error type for Meterguard adapters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeterError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Invalid input supplied by the caller
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// Resource not found at the external service
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        resource_type: Option<String>,
    },

    /// Dependency rejected by its circuit breaker
    #[error("Service {service} is currently unavailable")]
    Unavailable { service: String },

    /// External service call failed
    #[error("External service error from {service} ({kind}): {message}")]
    ExternalService {
        service: String,
        kind: String,
        message: String,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    /// Generic error with context
    #[error("Error: {message}")]
    Other {
        message: String,
        context: Option<String>,
    },
}
