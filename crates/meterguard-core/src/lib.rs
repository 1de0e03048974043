//! Meterguard Core Library
//!
//! This crate provides the resilient-execution layer used by Meterguard's billing
//! and metering adapters: per-dependency circuit breakers, failure classification,
//! the executor that ties them together, plus configuration, errors and logging.

pub mod config;
pub mod error;
pub mod logging;
pub mod resilience;

// Re-export commonly used types
pub use config::{Config, LoggingConfig, MeterConfig, OpenMeterConfig, ResilienceConfig};
pub use error::{CallError, FailureKind, MeterError, MeterResult, ServiceError, UnifiedError};
pub use resilience::{
    CallOptions, CircuitBreaker, CircuitBreakerRegistry, CircuitState, DependencyName,
    Recoverable, ResilientExecutor,
};
