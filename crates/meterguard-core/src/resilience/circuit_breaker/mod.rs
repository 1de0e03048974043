//! Circuit breaker pattern for fault tolerance
//!
//! Prevents cascading failures by failing fast against a dependency that keeps failing.

mod breaker;
mod registry;
mod types;


pub use breaker::CircuitBreaker;
pub use registry::CircuitBreakerRegistry;
pub use types::{
    CircuitBreakerConfig, CircuitBreakerStats, CircuitOpen, CircuitState, DEFAULT_FAILURE_THRESHOLD,
    DEFAULT_RESET_TIMEOUT, Permit,
};
