//! UnifiedError trait implementation for MeterError

use super::types::{MeterError, UnifiedError};

impl UnifiedError for MeterError {
    fn error_code(&self) -> &str {
        match self {
            Self::Config { .. } => "CONFIG_ERROR",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::NotFound { .. } => "RESOURCE_NOT_FOUND",
            Self::Unavailable { .. } => "SERVICE_UNAVAILABLE",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::Io { .. } => "IO_ERROR",
            Self::Other { .. } => "INTERNAL_ERROR",
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::Config { message, .. } => message,
            Self::InvalidInput { message, .. } => message,
            Self::NotFound { message, .. } => message,
            Self::Unavailable { .. } => "Service temporarily unavailable",
            Self::ExternalService { message, .. } => message,
            Self::Io { message, .. } => message,
            Self::Other { message, .. } => message,
        }
    }

    fn context(&self) -> Option<&str> {
        match self {
            Self::Config { context, .. } => context.as_deref(),
            Self::InvalidInput { field, .. } => field.as_deref(),
            Self::NotFound { resource_type, .. } => resource_type.as_deref(),
            Self::Unavailable { service } => Some(service.as_str()),
            Self::ExternalService { service, .. } => Some(service.as_str()),
            Self::Io { path, .. } => path.as_deref(),
            Self::Other { context, .. } => context.as_deref(),
        }
    }

    fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::ExternalService { .. } => 502,
            Self::Unavailable { .. } => 503,
            Self::Config { .. } | Self::Io { .. } | Self::Other { .. } => 500,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::ExternalService { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_and_failed_have_distinct_codes() {
        let unavailable = MeterError::unavailable("OpenMeter");
        let failed = MeterError::external_service("OpenMeter", "timeout", "timed out");

        assert_eq!(unavailable.error_code(), "SERVICE_UNAVAILABLE");
        assert_eq!(unavailable.status_code(), 503);
        assert_eq!(failed.error_code(), "EXTERNAL_SERVICE_ERROR");
        assert_eq!(failed.status_code(), 502);
        assert!(unavailable.is_retryable());
        assert!(failed.is_retryable());
    }

    #[test]
    fn test_not_found_is_not_retryable() {
        let err = MeterError::not_found_resource("subject", "Subject not found");
        assert_eq!(err.error_code(), "RESOURCE_NOT_FOUND");
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.context(), Some("subject"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unavailable_message_names_dependency() {
        let err = MeterError::unavailable("OpenMeter");
        assert_eq!(err.to_string(), "Service OpenMeter is currently unavailable");
        assert_eq!(err.context(), Some("OpenMeter"));
    }
}
