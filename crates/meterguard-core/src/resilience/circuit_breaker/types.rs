//! Circuit breaker types and configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

/// Default number of consecutive failures before the circuit opens
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Default time an open circuit waits before allowing a probe call
pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(30);

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Circuit is closed, operations proceed normally
    Closed,
    /// Circuit is open, operations are rejected
    Open,
    /// Circuit is half-open, a single probe call tests recovery
    HalfOpen,
}

/// Configuration for circuit breaker behavior, fixed at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Time to wait before transitioning from open to half-open
    #[serde(with = "humantime_serde")]
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            reset_timeout: DEFAULT_RESET_TIMEOUT,
        }
    }
}

/// Admission ticket for one call.
///
/// Every permit handed out by [`CircuitBreaker::try_acquire`](super::CircuitBreaker::try_acquire)
/// must be settled with exactly one `record_success` or `record_failure`.
#[derive(Debug)]
#[must_use = "a permit must be settled with record_success or record_failure"]
pub struct Permit {
    pub(super) probe: bool,
}

impl Permit {
    /// Whether this permit is the single half-open probe
    pub fn is_probe(&self) -> bool {
        self.probe
    }
}

/// Rejection signalled by an open circuit
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Circuit breaker open for component: {name}")]
pub struct CircuitOpen {
    pub name: String,
    /// Time left until a probe call will be admitted
    pub retry_after: Duration,
}

/// Statistics for a circuit breaker
#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub total_calls: u64,
    pub total_failures: u64,
    pub total_rejections: u64,
    pub last_failure: Option<Instant>,
    pub opened_at: Option<Instant>,
}

impl CircuitBreakerStats {
    /// Calculate failure rate as a percentage of admitted calls
    pub fn failure_rate(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            (self.total_failures as f64 / self.total_calls as f64) * 100.0
        }
    }
}
