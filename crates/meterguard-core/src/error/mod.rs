//! Error types for Meterguard
//!
//! Three layers of errors meet here:
//! - [`ServiceError`]: what an external collaborator raises, tagged with a [`FailureKind`]
//! - [`CallError`]: what the resilient executor returns for one protected call
//! - [`MeterError`]: the crate-wide error that adapters surface to their callers
//!
//! All of them implement [`UnifiedError`] so callers get a stable error code and an
//! HTTP-style status code regardless of where the failure originated.

mod call;
mod constructors;
mod conversions;
mod service;
mod types;
mod unified_error;

pub use call::CallError;
pub use service::{FailureKind, ServiceError};
pub use types::{MeterError, MeterResult, UnifiedError};
