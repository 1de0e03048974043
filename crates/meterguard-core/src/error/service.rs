//! Failures raised by external collaborators

use std::fmt;
use std::io;

use thiserror::Error;

/// Origin classification of a failed external call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The call did not complete within its deadline
    Timeout,
    /// The dependency could not be reached
    Connection,
    /// Non-2xx response without a more specific category
    Status(u16),
    /// The requested resource does not exist
    NotFound,
    /// The resource conflicts with existing state (e.g. already exists)
    Conflict,
    /// The dependency does not support the requested capability
    Unsupported,
    /// The request itself was malformed before reaching the dependency
    InvalidInput,
    /// The caller abandoned the call before it completed
    Cancelled,
    /// Anything the collaborator could not categorize
    Unclassified,
}

impl FailureKind {
    /// Stable tag carried by translated errors
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connection => "connection",
            Self::Status(_) => "http_status",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Unsupported => "unsupported",
            Self::InvalidInput => "invalid_input",
            Self::Cancelled => "cancelled",
            Self::Unclassified => "unclassified",
        }
    }

    /// Categorize an HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => Self::NotFound,
            409 => Self::Conflict,
            408 | 504 => Self::Timeout,
            501 => Self::Unsupported,
            other => Self::Status(other),
        }
    }

    /// Categorize an IO error kind
    pub fn from_io_kind(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::TimedOut => Self::Timeout,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::AddrNotAvailable => Self::Connection,
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::AlreadyExists => Self::Conflict,
            io::ErrorKind::Unsupported => Self::Unsupported,
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => Self::InvalidInput,
            io::ErrorKind::Interrupted => Self::Cancelled,
            _ => Self::Unclassified,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "{} {}", self.tag(), code),
            _ => f.write_str(self.tag()),
        }
    }
}

/// Error raised by a collaborator such as the metering vendor client
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ServiceError {
    pub kind: FailureKind,
    pub message: String,
    pub status_code: Option<u16>,
}

impl ServiceError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
        }
    }

    /// Build an error from a non-2xx response
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::from_status(status),
            message: message.into(),
            status_code: Some(status),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Connection, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Conflict, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Unsupported, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidInput, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Unclassified, message)
    }
}

impl From<io::Error> for ServiceError {
    fn from(error: io::Error) -> Self {
        Self::new(FailureKind::from_io_kind(error.kind()), error.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(error: reqwest::Error) -> Self {
        let message = error.to_string();
        if error.is_timeout() {
            Self::timeout(message)
        } else if error.is_connect() {
            Self::connection(message)
        } else if let Some(status) = error.status() {
            Self::from_status(status.as_u16(), message)
        } else if error.is_builder() {
            Self::invalid_input(message)
        } else {
            Self::other(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_table() {
        assert_eq!(FailureKind::from_status(404), FailureKind::NotFound);
        assert_eq!(FailureKind::from_status(409), FailureKind::Conflict);
        assert_eq!(FailureKind::from_status(504), FailureKind::Timeout);
        assert_eq!(FailureKind::from_status(501), FailureKind::Unsupported);
        assert_eq!(FailureKind::from_status(503), FailureKind::Status(503));
        assert_eq!(FailureKind::from_status(400), FailureKind::Status(400));
    }

    #[test]
    fn test_from_status_keeps_code() {
        let err = ServiceError::from_status(409, "Conflict: feature already exists");
        assert_eq!(err.kind, FailureKind::Conflict);
        assert_eq!(err.status_code, Some(409));
        assert_eq!(err.to_string(), "Conflict: feature already exists");
    }

    #[test]
    fn test_io_errors_are_categorized() {
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(ServiceError::from(refused).kind, FailureKind::Connection);

        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "slow");
        assert_eq!(ServiceError::from(timed_out).kind, FailureKind::Timeout);

        let weird = io::Error::other("???");
        assert_eq!(ServiceError::from(weird).kind, FailureKind::Unclassified);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(FailureKind::Timeout.to_string(), "timeout");
        assert_eq!(FailureKind::Status(502).to_string(), "http_status 502");
    }

    #[tokio::test]
    async fn test_reqwest_builder_error_is_invalid_input() {
        let err = reqwest::Client::new()
            .get("not a url")
            .send()
            .await
            .unwrap_err();

        assert_eq!(ServiceError::from(err).kind, FailureKind::InvalidInput);
    }
}
