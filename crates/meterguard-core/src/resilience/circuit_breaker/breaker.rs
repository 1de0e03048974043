//! Circuit breaker implementation

use parking_lot::Mutex;
use tokio::time::Instant;

use super::types::{CircuitBreakerConfig, CircuitBreakerStats, CircuitOpen, CircuitState, Permit};

/// Mutable bookkeeping, always updated under a single lock
#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    total_calls: u64,
    total_failures: u64,
    total_rejections: u64,
    last_failure: Option<Instant>,
}

impl BreakerInner {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            probe_in_flight: false,
            total_calls: 0,
            total_failures: 0,
            total_rejections: 0,
            last_failure: None,
        }
    }
}

/// Circuit breaker for protecting against a failing dependency
///
/// Closed admits every call, Open rejects until `reset_timeout` has passed since it
/// opened, then the next caller becomes the single Half-Open probe. Outcomes are
/// applied in the order they are reported.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Component name (for logging)
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with default config
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, CircuitBreakerConfig::default())
    }

    /// Create a new circuit breaker with custom config.
    ///
    /// A zero failure threshold is raised to 1.
    pub fn with_config(name: impl Into<String>, mut config: CircuitBreakerConfig) -> Self {
        config.failure_threshold = config.failure_threshold.max(1);
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner::closed()),
        }
    }

    /// Get the component name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Get the current state.
    ///
    /// An open circuit whose reset timeout has elapsed reports `HalfOpen`; the actual
    /// transition happens when the next call is admitted.
    pub fn state(&self) -> CircuitState {
        let inner = self.inner.lock();
        self.effective_state(&inner, Instant::now())
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    /// Check whether a call made now would be admitted
    pub fn is_allowed(&self) -> bool {
        let inner = self.inner.lock();
        match self.effective_state(&inner, Instant::now()) {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => !inner.probe_in_flight,
        }
    }

    /// Ask permission to make a call.
    ///
    /// Rejection is synchronous and never touches the wrapped operation.
    pub fn try_acquire(&self) -> Result<Permit, CircuitOpen> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        match inner.state {
            CircuitState::Closed => {
                inner.total_calls += 1;
                Ok(Permit { probe: false })
            }
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|opened_at| now.saturating_duration_since(opened_at))
                    .unwrap_or(self.config.reset_timeout);

                if elapsed >= self.config.reset_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    inner.total_calls += 1;

                    tracing::info!(
                        circuit = %self.name,
                        "Circuit breaker transitioning to half-open, admitting probe call"
                    );
                    Ok(Permit { probe: true })
                } else {
                    inner.total_rejections += 1;
                    Err(CircuitOpen {
                        name: self.name.clone(),
                        retry_after: self.config.reset_timeout - elapsed,
                    })
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    inner.total_rejections += 1;
                    Err(CircuitOpen {
                        name: self.name.clone(),
                        retry_after: std::time::Duration::ZERO,
                    })
                } else {
                    inner.probe_in_flight = true;
                    inner.total_calls += 1;
                    Ok(Permit { probe: true })
                }
            }
        }
    }

    /// Record a successful operation
    pub fn record_success(&self, permit: Permit) {
        let mut inner = self.inner.lock();

        match (inner.state, permit.probe) {
            (CircuitState::Closed, false) => {
                inner.consecutive_failures = 0;
            }
            (CircuitState::HalfOpen, true) => {
                self.transition_to_closed(&mut inner);
            }
            // Outcome of a call admitted before the circuit changed state
            _ => {
                tracing::debug!(
                    circuit = %self.name,
                    state = ?inner.state,
                    "Ignoring stale success"
                );
            }
        }
    }

    /// Record a failed operation
    pub fn record_failure(&self, permit: Permit) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.total_failures += 1;
        inner.last_failure = Some(now);

        match (inner.state, permit.probe) {
            (CircuitState::Closed, false) => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    self.transition_to_open(&mut inner, now);
                }
            }
            (CircuitState::HalfOpen, true) => {
                // Any failure in half-open state opens the circuit again
                self.transition_to_open(&mut inner, now);
            }
            _ => {
                tracing::debug!(
                    circuit = %self.name,
                    state = ?inner.state,
                    "Ignoring stale failure"
                );
            }
        }
    }

    /// Get circuit breaker statistics
    pub fn stats(&self) -> CircuitBreakerStats {
        let inner = self.inner.lock();
        CircuitBreakerStats {
            state: self.effective_state(&inner, Instant::now()),
            consecutive_failures: inner.consecutive_failures,
            total_calls: inner.total_calls,
            total_failures: inner.total_failures,
            total_rejections: inner.total_rejections,
            last_failure: inner.last_failure,
            opened_at: inner.opened_at,
        }
    }

    /// Manually reset the circuit breaker to closed state
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        self.transition_to_closed(&mut inner);
    }

    /// Manually open the circuit breaker
    pub fn trip(&self) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = inner
            .consecutive_failures
            .max(self.config.failure_threshold);
        self.transition_to_open(&mut inner, Instant::now());
    }

    fn effective_state(&self, inner: &BreakerInner, now: Instant) -> CircuitState {
        match (inner.state, inner.opened_at) {
            (CircuitState::Open, Some(opened_at))
                if now.saturating_duration_since(opened_at) >= self.config.reset_timeout =>
            {
                CircuitState::HalfOpen
            }
            (state, _) => state,
        }
    }

    fn transition_to_open(&self, inner: &mut BreakerInner, now: Instant) {
        let reopened = inner.state == CircuitState::HalfOpen;
        inner.state = CircuitState::Open;
        inner.opened_at = Some(now);
        inner.probe_in_flight = false;

        if reopened {
            tracing::warn!(
                circuit = %self.name,
                "Circuit breaker re-opened after failed probe"
            );
        } else {
            tracing::warn!(
                circuit = %self.name,
                "Circuit breaker opened after {} failures",
                inner.consecutive_failures
            );
        }
    }

    fn transition_to_closed(&self, inner: &mut BreakerInner) {
        let was = inner.state;
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.probe_in_flight = false;

        if was != CircuitState::Closed {
            tracing::info!(circuit = %self.name, "Circuit breaker closed");
        }
    }
}
