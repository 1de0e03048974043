//! Resilient execution layer
//!
//! This module wraps outbound calls to named dependencies:
//! - Circuit breaker per dependency (Closed → Open → Half-Open)
//! - Registry owning one breaker per dependency name
//! - Error classification (pass through, translate, recover with a default)
//! - Executor composing all three around a caller-supplied operation
//!
//! # Example
//! ```no_run
//! use meterguard_core::error::ServiceError;
//! use meterguard_core::resilience::{CallOptions, DependencyName, Recoverable, ResilientExecutor};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = ResilientExecutor::default();
//! let openmeter = DependencyName::new("OpenMeter")?;
//!
//! executor
//!     .call(
//!         &openmeter,
//!         CallOptions::new().recover(Recoverable::AlreadyExists, ()),
//!         || async { Err::<(), _>(ServiceError::from_status(409, "feature already exists")) },
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod circuit_breaker;
pub mod classifier;
mod dependency;
mod executor;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitBreakerStats,
    CircuitOpen, CircuitState, Permit,
};
pub use classifier::{Classify, Disposition, Recoverable};
pub use dependency::DependencyName;
pub use executor::{CallOptions, ResilientExecutor};
