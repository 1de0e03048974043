//! Integration tests for the resilient execution layer
//!
//! Exercises the executor, registry and breaker together through the public API.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use futures::future::join_all;
use meterguard_core::{
    CallError, CallOptions, CircuitState, DependencyName, FailureKind, MeterError, ResilienceConfig,
    ResilientExecutor, ServiceError, UnifiedError,
};
use tokio_test::{assert_err, assert_ok};

fn openmeter() -> DependencyName {
    DependencyName::new("OpenMeter").unwrap()
}

/// Threshold 3, reset 30s: three connection failures open the circuit, the fourth
/// call fails fast, and after the reset timeout a successful probe closes it again.
#[tokio::test(start_paused = true)]
async fn test_open_reject_probe_close_cycle() {
    let executor = ResilientExecutor::default();
    let dependency = openmeter();
    let invocations = AtomicU32::new(0);
    let counter = &invocations;

    for _ in 0..3 {
        let result = executor
            .call(&dependency, CallOptions::new(), || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(ServiceError::connection("connection refused"))
            })
            .await;

        match assert_err!(result) {
            CallError::ExternalService { dependency, kind, .. } => {
                assert_eq!(dependency, "OpenMeter");
                assert_eq!(kind, FailureKind::Connection);
            }
            other => panic!("expected translated error, got {other:?}"),
        }
    }
    assert_eq!(executor.breaker(&dependency).state(), CircuitState::Open);

    // Call 4: rejected without touching the operation
    let result = executor
        .call(&dependency, CallOptions::new(), || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<u32, ServiceError>(0)
        })
        .await;
    let err = assert_err!(result);
    assert!(err.is_unavailable());
    assert_eq!(err.status_code(), 503);
    assert_eq!(invocations.load(Ordering::SeqCst), 3);

    tokio::time::advance(Duration::from_secs(31)).await;
    assert_eq!(executor.breaker(&dependency).state(), CircuitState::HalfOpen);

    // Call 5: probe succeeds and closes the circuit
    let value = executor
        .call(&dependency, CallOptions::new(), || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<u32, ServiceError>(5)
        })
        .await;
    assert_eq!(assert_ok!(value), 5);
    assert_eq!(executor.breaker(&dependency).state(), CircuitState::Closed);

    // Call 6: business as usual
    let value = executor
        .call(&dependency, CallOptions::new(), || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<u32, ServiceError>(6)
        })
        .await;
    assert_eq!(assert_ok!(value), 6);
    assert_eq!(invocations.load(Ordering::SeqCst), 5);

    let stats = executor.breaker(&dependency).stats();
    assert_eq!(stats.consecutive_failures, 0);
    assert_eq!(stats.total_rejections, 1);
}

#[tokio::test(start_paused = true)]
async fn test_open_circuit_returns_fallback() {
    let executor = ResilientExecutor::default();
    let dependency = openmeter();
    executor.breaker(&dependency).trip();

    let value = executor
        .call(&dependency, CallOptions::new().fallback(-1), || async {
            Ok::<i64, ServiceError>(42)
        })
        .await;
    assert_eq!(assert_ok!(value), -1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_outcomes_are_not_lost() {
    let config = ResilienceConfig {
        failure_threshold: 10_000,
        ..Default::default()
    };
    let executor = ResilientExecutor::shared(&config).unwrap();
    let dependency = openmeter();

    let handles = (0..200u32).map(|i| {
        let executor = Arc::clone(&executor);
        let dependency = dependency.clone();
        tokio::spawn(async move {
            executor
                .call(&dependency, CallOptions::new(), || async move {
                    tokio::task::yield_now().await;
                    if i % 2 == 0 {
                        Ok(i)
                    } else {
                        Err(ServiceError::from_status(500, "Internal Server Error"))
                    }
                })
                .await
        })
    });

    let results = join_all(handles).await;
    let failures = results
        .into_iter()
        .map(|joined| joined.unwrap())
        .filter(Result::is_err)
        .count();

    let stats = executor.breaker(&dependency).stats();
    assert_eq!(failures, 100);
    assert_eq!(stats.total_calls, 200);
    assert_eq!(stats.total_failures, 100);
    assert_eq!(stats.total_rejections, 0);
    assert_eq!(executor.registry().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_calls_count_as_failures() {
    let executor = ResilientExecutor::default();
    let dependency = openmeter();

    for _ in 0..3 {
        let call = executor.call(&dependency, CallOptions::new(), || async {
            std::future::pending::<Result<(), ServiceError>>().await
        });
        assert!(tokio::time::timeout(Duration::from_millis(10), call).await.is_err());
    }

    let breaker = executor.breaker(&dependency);
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(breaker.stats().total_failures, 3);
}

#[tokio::test]
async fn test_call_errors_convert_into_meter_error() {
    let executor = ResilientExecutor::default();
    let dependency = openmeter();

    let err: MeterError = executor
        .call(&dependency, CallOptions::new(), || async {
            Err::<(), _>(ServiceError::from_status(502, "Bad Gateway"))
        })
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.error_code(), "EXTERNAL_SERVICE_ERROR");
    assert_eq!(err.status_code(), 502);
    assert!(err.is_retryable());

    let err: MeterError = executor
        .call(&dependency, CallOptions::new(), || async {
            Err::<(), _>(ServiceError::not_found("subject 42 not found"))
        })
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.error_code(), "RESOURCE_NOT_FOUND");
    assert_eq!(err.status_code(), 404);
}

#[test]
fn test_blocking_calls_share_breakers_with_async_calls() {
    let executor = ResilientExecutor::default();
    let dependency = openmeter();

    for _ in 0..3 {
        let result: Result<(), _> = executor.call_blocking(&dependency, CallOptions::new(), || {
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer"))
        });
        assert!(matches!(result, Err(CallError::ExternalService { .. })));
    }

    let rejected = tokio_test::block_on(executor.call(&dependency, CallOptions::new(), || async {
        Ok::<(), ServiceError>(())
    }));
    assert!(rejected.unwrap_err().is_unavailable());
}
