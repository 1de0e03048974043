//! Failure classification for protected calls
//!
//! Decides what happens to a failure raised by a wrapped operation:
//!
//! | kind                                                     | disposition  |
//! |----------------------------------------------------------|--------------|
//! | timeout, connection, cancelled, http status, unclassified | translate    |
//! | conflict                                                 | translate    |
//! | unsupported                                              | translate    |
//! | not found                                                | pass through |
//! | invalid input                                            | pass through |
//!
//! A caller may opt specific benign conditions into a recoverable default
//! (see [`Recoverable`]); those override the table above.

use std::io;

use crate::error::{FailureKind, MeterError, ServiceError};

/// Marker the vendor puts in conflict messages for idempotent creates
const ALREADY_EXISTS_MARKER: &str = "already exists";

/// Errors the executor knows how to classify
pub trait Classify: std::fmt::Display {
    fn failure_kind(&self) -> FailureKind;

    /// Message carried into translated errors
    fn failure_message(&self) -> String {
        self.to_string()
    }
}

impl Classify for ServiceError {
    fn failure_kind(&self) -> FailureKind {
        self.kind
    }

    fn failure_message(&self) -> String {
        self.message.clone()
    }
}

impl Classify for io::Error {
    fn failure_kind(&self) -> FailureKind {
        FailureKind::from_io_kind(self.kind())
    }
}

impl Classify for MeterError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            MeterError::NotFound { .. } => FailureKind::NotFound,
            MeterError::InvalidInput { .. } | MeterError::Config { .. } => {
                FailureKind::InvalidInput
            }
            MeterError::Unavailable { .. } => FailureKind::Connection,
            MeterError::ExternalService { .. } | MeterError::Io { .. } | MeterError::Other { .. } => {
                FailureKind::Unclassified
            }
        }
    }
}

/// Known benign conditions a caller can map to a default result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recoverable {
    /// Conflict whose message says the resource already exists
    AlreadyExists,
    /// The remote API does not offer the requested capability
    Unsupported,
    /// The resource is missing and absence is an acceptable answer
    NotFound,
}

impl Recoverable {
    /// Whether `error` is an instance of this condition
    pub fn matches<E: Classify + ?Sized>(&self, error: &E) -> bool {
        match (self, error.failure_kind()) {
            (Self::AlreadyExists, FailureKind::Conflict) => error
                .failure_message()
                .to_lowercase()
                .contains(ALREADY_EXISTS_MARKER),
            (Self::Unsupported, FailureKind::Unsupported) => true,
            (Self::NotFound, FailureKind::NotFound) => true,
            _ => false,
        }
    }
}

/// What the executor does with a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Propagate the original error unchanged
    PassThrough,
    /// Wrap into a standardized external-service error
    Translate,
    /// Swallow the error and return the caller's default
    Recover(Recoverable),
}

impl Disposition {
    /// Whether the breaker should count this outcome as a failure
    pub fn counts_as_failure(&self, count_passthrough: bool) -> bool {
        match self {
            Self::Translate => true,
            Self::PassThrough => count_passthrough,
            Self::Recover(_) => false,
        }
    }
}

/// Default disposition per failure kind
pub fn default_disposition(kind: FailureKind) -> Disposition {
    match kind {
        FailureKind::Timeout
        | FailureKind::Connection
        | FailureKind::Cancelled
        | FailureKind::Status(_)
        | FailureKind::Conflict
        | FailureKind::Unsupported
        | FailureKind::Unclassified => Disposition::Translate,
        FailureKind::NotFound | FailureKind::InvalidInput => Disposition::PassThrough,
    }
}

/// Classify a failure, honoring the recoverable conditions the caller opted into
pub fn classify<E: Classify + ?Sized>(error: &E, recoverable: &[Recoverable]) -> Disposition {
    recoverable
        .iter()
        .find(|condition| condition.matches(error))
        .map(|condition| Disposition::Recover(*condition))
        .unwrap_or_else(|| default_disposition(error.failure_kind()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_health_failures_translate() {
        for err in [
            ServiceError::timeout("timed out"),
            ServiceError::connection("connection refused"),
            ServiceError::from_status(503, "Service Unavailable"),
            ServiceError::from_status(400, "Bad Request"),
            ServiceError::other("boom"),
        ] {
            assert_eq!(classify(&err, &[]), Disposition::Translate, "{err}");
        }
    }

    #[test]
    fn test_caller_errors_pass_through() {
        assert_eq!(
            classify(&ServiceError::invalid_input("negative tokens"), &[]),
            Disposition::PassThrough
        );
        assert_eq!(
            classify(&ServiceError::not_found("no subject"), &[]),
            Disposition::PassThrough
        );
    }

    #[test]
    fn test_already_exists_requires_conflict_and_marker() {
        let recoverable = [Recoverable::AlreadyExists];

        let exists = ServiceError::from_status(409, "Conflict: feature ai_tokens Already Exists");
        assert_eq!(
            classify(&exists, &recoverable),
            Disposition::Recover(Recoverable::AlreadyExists)
        );

        let other_conflict = ServiceError::from_status(409, "Conflict: version mismatch");
        assert_eq!(classify(&other_conflict, &recoverable), Disposition::Translate);

        // The marker alone is not enough without a conflict category
        let not_conflict = ServiceError::from_status(500, "meter already exists in cache");
        assert_eq!(classify(&not_conflict, &recoverable), Disposition::Translate);
    }

    #[test]
    fn test_unsupported_and_not_found_only_recover_when_opted_in() {
        let unsupported = ServiceError::unsupported("get_usage not available");
        assert_eq!(classify(&unsupported, &[]), Disposition::Translate);
        assert_eq!(
            classify(&unsupported, &[Recoverable::Unsupported]),
            Disposition::Recover(Recoverable::Unsupported)
        );

        let missing = ServiceError::not_found("feature missing");
        assert_eq!(
            classify(&missing, &[Recoverable::Unsupported, Recoverable::NotFound]),
            Disposition::Recover(Recoverable::NotFound)
        );
    }

    #[test]
    fn test_io_errors_classify_by_kind() {
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(classify(&refused, &[]), Disposition::Translate);

        let bad = io::Error::new(io::ErrorKind::InvalidInput, "bad path");
        assert_eq!(classify(&bad, &[]), Disposition::PassThrough);
    }

    #[test]
    fn test_failure_accounting_follows_disposition() {
        assert!(Disposition::Translate.counts_as_failure(false));
        assert!(Disposition::PassThrough.counts_as_failure(true));
        assert!(!Disposition::PassThrough.counts_as_failure(false));
        assert!(!Disposition::Recover(Recoverable::AlreadyExists).counts_as_failure(true));
    }
}
