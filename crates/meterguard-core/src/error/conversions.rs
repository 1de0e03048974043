//! From trait implementations for MeterError conversions

use super::service::{FailureKind, ServiceError};
use super::types::{MeterError, UnifiedError};

impl From<std::io::Error> for MeterError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for MeterError {
    fn from(error: serde_json::Error) -> Self {
        Self::other(format!("JSON error: {}", error))
    }
}

/// Collaborator errors that reach this conversion were passed through by the
/// executor, so they carry no dependency attribution.
impl From<ServiceError> for MeterError {
    fn from(error: ServiceError) -> Self {
        match error.kind {
            FailureKind::NotFound => Self::not_found(error.message),
            FailureKind::InvalidInput => Self::invalid_input(error.message),
            kind => Self::Other {
                message: error.message,
                context: Some(kind.to_string()),
            },
        }
    }
}

impl UnifiedError for ServiceError {
    fn error_code(&self) -> &str {
        match self.kind {
            FailureKind::NotFound => "RESOURCE_NOT_FOUND",
            FailureKind::InvalidInput => "INVALID_INPUT",
            _ => "EXTERNAL_SERVICE_ERROR",
        }
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn status_code(&self) -> u16 {
        match self.kind {
            FailureKind::NotFound => 404,
            FailureKind::InvalidInput => 400,
            _ => 502,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            FailureKind::Timeout | FailureKind::Connection | FailureKind::Cancelled
        )
    }
}
