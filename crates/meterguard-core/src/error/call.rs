//! Outcome errors of a breaker-protected call

use thiserror::Error;

use super::service::FailureKind;
use super::types::{MeterError, UnifiedError};

/// Error returned by the resilient executor for a single call
#[derive(Error, Debug)]
pub enum CallError<E> {
    /// The breaker rejected the call; the operation was never invoked
    #[error("Service {dependency} is currently unavailable")]
    Unavailable { dependency: String },

    /// The operation failed for a dependency-health reason
    #[error("External service error from {dependency} ({kind}): {message}")]
    ExternalService {
        dependency: String,
        kind: FailureKind,
        message: String,
    },

    /// The operation's own error, propagated unchanged
    #[error(transparent)]
    Operation(E),
}

impl<E> CallError<E> {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Dependency the failure is attributed to, if the executor produced it
    pub fn dependency(&self) -> Option<&str> {
        match self {
            Self::Unavailable { dependency } | Self::ExternalService { dependency, .. } => {
                Some(dependency.as_str())
            }
            Self::Operation(_) => None,
        }
    }

    pub fn into_operation(self) -> Option<E> {
        match self {
            Self::Operation(e) => Some(e),
            _ => None,
        }
    }
}

impl<E: UnifiedError + 'static> UnifiedError for CallError<E> {
    fn error_code(&self) -> &str {
        match self {
            Self::Unavailable { .. } => "SERVICE_UNAVAILABLE",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::Operation(e) => e.error_code(),
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::Unavailable { .. } => "Service temporarily unavailable",
            Self::ExternalService { message, .. } => message,
            Self::Operation(e) => e.message(),
        }
    }

    fn context(&self) -> Option<&str> {
        match self {
            Self::Operation(e) => e.context(),
            _ => self.dependency(),
        }
    }

    fn status_code(&self) -> u16 {
        match self {
            Self::Unavailable { .. } => 503,
            Self::ExternalService { .. } => 502,
            Self::Operation(e) => e.status_code(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Operation(e) => e.is_retryable(),
            _ => true,
        }
    }
}

impl<E: Into<MeterError>> From<CallError<E>> for MeterError {
    fn from(error: CallError<E>) -> Self {
        match error {
            CallError::Unavailable { dependency } => MeterError::Unavailable {
                service: dependency,
            },
            CallError::ExternalService {
                dependency,
                kind,
                message,
            } => MeterError::ExternalService {
                service: dependency,
                kind: kind.to_string(),
                message,
            },
            CallError::Operation(e) => e.into(),
        }
    }
}
