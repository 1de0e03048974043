//! Resilient execution of calls to external dependencies
//!
//! ```text
//! call(name, options, op)
//!     → registry.get_or_create(name)
//!     → breaker.try_acquire()   ── rejected ──→ fallback | CallError::Unavailable
//!     → op().await
//!     → Ok  → record_success → value
//!     → Err → classify → Recover   → record_success → default
//!                      → Translate → record_failure → CallError::ExternalService
//!                      → PassThrough → record_failure* → CallError::Operation
//! ```
//! `*` configurable through `ResilienceConfig::count_passthrough_failures`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerRegistry, CircuitOpen, Permit};
use super::classifier::{self, Classify, Disposition, Recoverable};
use super::DependencyName;
use crate::config::ResilienceConfig;
use crate::error::{CallError, FailureKind, MeterResult};

/// Per-call substitutes for failure outcomes
#[derive(Debug)]
pub struct CallOptions<T> {
    fallback: Option<T>,
    defaults: Vec<(Recoverable, T)>,
}

impl<T> CallOptions<T> {
    pub fn new() -> Self {
        Self {
            fallback: None,
            defaults: Vec::new(),
        }
    }

    /// Value returned instead of failing when the circuit is open
    pub fn fallback(mut self, value: T) -> Self {
        self.fallback = Some(value);
        self
    }

    /// Value returned when the call fails with the given benign condition
    pub fn recover(mut self, condition: Recoverable, default: T) -> Self {
        self.defaults.retain(|(existing, _)| *existing != condition);
        self.defaults.push((condition, default));
        self
    }

    fn recoverable(&self) -> Vec<Recoverable> {
        self.defaults.iter().map(|(condition, _)| *condition).collect()
    }

    fn take_default(&mut self, condition: Recoverable) -> Option<T> {
        let index = self
            .defaults
            .iter()
            .position(|(existing, _)| *existing == condition)?;
        Some(self.defaults.swap_remove(index).1)
    }
}

impl<T> Default for CallOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Failure of an admitted attempt, before classification
enum AttemptFailure<E> {
    Operation(E),
    TimedOut(Duration),
}

/// Settles a permit exactly once; an attempt dropped before settling counts as failed
struct AttemptGuard<'a> {
    breaker: &'a CircuitBreaker,
    permit: Option<Permit>,
}

impl<'a> AttemptGuard<'a> {
    fn new(breaker: &'a CircuitBreaker, permit: Permit) -> Self {
        Self {
            breaker,
            permit: Some(permit),
        }
    }

    fn success(mut self) {
        if let Some(permit) = self.permit.take() {
            self.breaker.record_success(permit);
        }
    }

    fn failure(mut self) {
        if let Some(permit) = self.permit.take() {
            self.breaker.record_failure(permit);
        }
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if let Some(permit) = self.permit.take() {
            tracing::warn!(
                circuit = %self.breaker.name(),
                "Call abandoned before completion, counting as failure"
            );
            self.breaker.record_failure(permit);
        }
    }
}

/// Runs operations against named dependencies under circuit breaker protection.
///
/// Owns the breaker registry for the process; share it as `Arc<ResilientExecutor>`.
/// Never retries: a caller that wants another attempt calls again.
#[derive(Debug)]
pub struct ResilientExecutor {
    registry: CircuitBreakerRegistry,
    call_timeout: Option<Duration>,
    count_passthrough_failures: bool,
}

impl ResilientExecutor {
    /// Build an executor; rejects settings that would break the breaker invariants
    pub fn new(config: &ResilienceConfig) -> MeterResult<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    pub fn shared(config: &ResilienceConfig) -> MeterResult<Arc<Self>> {
        Self::new(config).map(Arc::new)
    }

    fn from_validated(config: &ResilienceConfig) -> Self {
        Self {
            registry: CircuitBreakerRegistry::with_config(config.breaker_config()),
            call_timeout: config.call_timeout,
            count_passthrough_failures: config.count_passthrough_failures,
        }
    }

    pub fn registry(&self) -> &CircuitBreakerRegistry {
        &self.registry
    }

    /// Breaker guarding `dependency`, created on first use
    pub fn breaker(&self, dependency: &DependencyName) -> Arc<CircuitBreaker> {
        self.registry.get_or_create(dependency)
    }

    /// Execute an async operation with circuit breaker protection.
    ///
    /// Dropping the returned future after the operation started counts as a failure.
    pub async fn call<T, E, F, Fut>(
        &self,
        dependency: &DependencyName,
        mut options: CallOptions<T>,
        operation: F,
    ) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        let breaker = self.registry.get_or_create(dependency);
        let permit = match breaker.try_acquire() {
            Ok(permit) => permit,
            Err(open) => return Self::reject(dependency, open, options.fallback.take()),
        };
        let guard = AttemptGuard::new(&breaker, permit);

        let outcome = match self.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, operation()).await {
                Ok(result) => result.map_err(AttemptFailure::Operation),
                Err(_) => Err(AttemptFailure::TimedOut(limit)),
            },
            None => operation().await.map_err(AttemptFailure::Operation),
        };

        self.settle(dependency, guard, outcome, options)
    }

    /// Execute a synchronous operation with circuit breaker protection.
    ///
    /// Same semantics as [`call`](Self::call) except that `call_timeout` is not
    /// enforced; a blocking operation has to bound itself.
    pub fn call_blocking<T, E, F>(
        &self,
        dependency: &DependencyName,
        mut options: CallOptions<T>,
        operation: F,
    ) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Result<T, E>,
        E: Classify,
    {
        let breaker = self.registry.get_or_create(dependency);
        let permit = match breaker.try_acquire() {
            Ok(permit) => permit,
            Err(open) => return Self::reject(dependency, open, options.fallback.take()),
        };
        let guard = AttemptGuard::new(&breaker, permit);

        let outcome = operation().map_err(AttemptFailure::Operation);
        self.settle(dependency, guard, outcome, options)
    }

    fn reject<T, E>(
        dependency: &DependencyName,
        open: CircuitOpen,
        fallback: Option<T>,
    ) -> Result<T, CallError<E>> {
        tracing::warn!(
            dependency = %dependency,
            retry_after_ms = open.retry_after.as_millis() as u64,
            fallback = fallback.is_some(),
            "Circuit breaker for {} is open, failing fast",
            dependency
        );

        fallback.ok_or_else(|| CallError::Unavailable {
            dependency: dependency.to_string(),
        })
    }

    fn settle<T, E: Classify>(
        &self,
        dependency: &DependencyName,
        guard: AttemptGuard<'_>,
        outcome: Result<T, AttemptFailure<E>>,
        mut options: CallOptions<T>,
    ) -> Result<T, CallError<E>> {
        let error = match outcome {
            Ok(value) => {
                guard.success();
                return Ok(value);
            }
            Err(AttemptFailure::TimedOut(limit)) => {
                guard.failure();
                tracing::warn!(
                    dependency = %dependency,
                    timeout_ms = limit.as_millis() as u64,
                    "Call timed out"
                );
                return Err(CallError::ExternalService {
                    dependency: dependency.to_string(),
                    kind: FailureKind::Timeout,
                    message: format!("Call to {} timed out after {:?}", dependency, limit),
                });
            }
            Err(AttemptFailure::Operation(error)) => error,
        };

        let disposition = classifier::classify(&error, &options.recoverable());
        if !disposition.counts_as_failure(self.count_passthrough_failures) {
            guard.success();
        } else {
            guard.failure();
        }

        match disposition {
            Disposition::Recover(condition) => match options.take_default(condition) {
                Some(default) => {
                    tracing::info!(
                        dependency = %dependency,
                        condition = ?condition,
                        "Recovered from benign failure: {}",
                        error
                    );
                    Ok(default)
                }
                None => Err(Self::translate(dependency, &error)),
            },
            Disposition::Translate => {
                tracing::error!(
                    dependency = %dependency,
                    kind = %error.failure_kind(),
                    "External service call failed: {}",
                    error
                );
                Err(Self::translate(dependency, &error))
            }
            Disposition::PassThrough => {
                tracing::debug!(
                    dependency = %dependency,
                    kind = %error.failure_kind(),
                    "Propagating operation error unchanged"
                );
                Err(CallError::Operation(error))
            }
        }
    }

    fn translate<E: Classify>(dependency: &DependencyName, error: &E) -> CallError<E> {
        CallError::ExternalService {
            dependency: dependency.to_string(),
            kind: error.failure_kind(),
            message: error.failure_message(),
        }
    }
}

impl Default for ResilientExecutor {
    fn default() -> Self {
        Self::from_validated(&ResilienceConfig::default())
    }
}
