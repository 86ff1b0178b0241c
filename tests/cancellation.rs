//! Cancellation-propagation tests over the in-memory backend.
//!
//! Timing-sensitive cases run on a paused clock so the races are
//! deterministic per iteration while still exercising both orders.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use dogsearch::cancel::{dispatch, CancelError, TaskHandle, TaskState};
use dogsearch::db::{BackendPid, PoolLane, PoolSnapshot};
use dogsearch::query::{Orchestrator, QueryError};

mod common;
use common::{FakeBackend, FIRST_PID};

fn orchestrator(backend: &FakeBackend) -> Arc<Orchestrator<FakeBackend>> {
    Arc::new(Orchestrator::new(Arc::new(backend.clone()), 500))
}

#[tokio::test(start_paused = true)]
async fn settled_query_is_never_cancelled() {
    let backend = FakeBackend::new();
    backend.push_dogs(&["Rexbark Smithdog", "Lunabark Jonesdog"]);
    let orch = orchestrator(&backend);

    let token = CancellationToken::new();
    let result = orch.run_search("bark", token.clone()).await;
    assert_eq!(result.unwrap().len(), 2);

    // Disconnect observed 10ms after the query settled: too late to matter.
    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();
    tokio::task::yield_now().await;

    assert_eq!(backend.cancel_count(), 0);
    assert_eq!(backend.acquire_count(PoolLane::Primary), 1);
    assert_eq!(backend.release_count(PoolLane::Primary), 1);
}

#[tokio::test(start_paused = true)]
async fn early_disconnect_cancels_with_the_captured_pid() {
    let backend = FakeBackend::new();
    backend.set_search_delay(Duration::from_millis(1000));
    let orch = orchestrator(&backend);

    let token = CancellationToken::new();
    let task = {
        let orch = orch.clone();
        let token = token.clone();
        tokio::spawn(async move { orch.run_search("bark", token).await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();

    let result = task.await.unwrap();
    assert!(matches!(result, Err(QueryError::Abandoned)));

    // Dispatched exactly once, targeting the pid captured at connect time.
    assert_eq!(backend.cancelled_pids(), vec![BackendPid(FIRST_PID)]);
    // Task connection plus cancellation connection, each released once.
    assert_eq!(backend.acquire_count(PoolLane::Primary), 2);
    assert_eq!(backend.release_count(PoolLane::Primary), 2);
    assert_eq!(backend.acquire_count(PoolLane::Fallback), 0);
}

#[tokio::test(start_paused = true)]
async fn reentrant_disconnect_releases_the_connection_once() {
    let backend = FakeBackend::new();
    backend.set_search_delay(Duration::from_millis(1000));
    let orch = orchestrator(&backend);

    let token = CancellationToken::new();
    let task = {
        let orch = orch.clone();
        let token = token.clone();
        tokio::spawn(async move { orch.run_search("bark", token).await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    // A close event firing twice must not double anything.
    token.cancel();
    token.cancel();

    let result = task.await.unwrap();
    assert!(matches!(result, Err(QueryError::Abandoned)));
    assert_eq!(backend.cancel_count(), 1);
    assert_eq!(backend.acquire_count(PoolLane::Primary), 2);
    assert_eq!(backend.release_count(PoolLane::Primary), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_query_settles_and_skips_cancellation() {
    let backend = FakeBackend::new();
    backend.set_fail_search(true);
    let orch = orchestrator(&backend);

    let token = CancellationToken::new();
    let result = orch.run_search("bark", token.clone()).await;
    assert!(matches!(result, Err(QueryError::Backend(_))));

    token.cancel();
    tokio::task::yield_now().await;

    assert_eq!(backend.cancel_count(), 0);
    assert_eq!(backend.release_count(PoolLane::Primary), 1);
}

#[tokio::test]
async fn acquire_failure_surfaces_without_cancellation() {
    let backend = FakeBackend::new();
    backend.set_fail_acquire(PoolLane::Primary);
    let orch = orchestrator(&backend);

    let result = orch.run_search("bark", CancellationToken::new()).await;
    assert!(matches!(result, Err(QueryError::AcquireConnection(_))));
    assert_eq!(backend.cancel_count(), 0);
    assert_eq!(backend.release_count(PoolLane::Primary), 0);
}

/// Sweep both orders of the (query latency, disconnect timing) race and
/// check the per-request accounting in every case: exactly one terminal
/// outcome, cancel dispatched iff abandoned, every checkout released once.
#[tokio::test(start_paused = true)]
async fn every_timing_order_settles_exactly_once() {
    let timings: &[(u64, u64)] = &[
        (0, 10),
        (10, 0),
        (5, 5),
        (50, 10),
        (10, 50),
        (100, 100),
        (0, 0),
    ];

    for &(query_ms, disconnect_ms) in timings {
        let backend = FakeBackend::new();
        backend.push_dogs(&["Rexbark Smithdog"]);
        backend.set_search_delay(Duration::from_millis(query_ms));
        let orch = orchestrator(&backend);

        let token = CancellationToken::new();
        let task = {
            let orch = orch.clone();
            let token = token.clone();
            tokio::spawn(async move { orch.run_search("bark", token).await })
        };

        tokio::time::sleep(Duration::from_millis(disconnect_ms)).await;
        token.cancel();

        match task.await.unwrap() {
            Ok(rows) => {
                assert_eq!(rows.len(), 1, "timing {query_ms}/{disconnect_ms}");
                assert_eq!(
                    backend.cancel_count(),
                    0,
                    "completed request must not dispatch a cancel ({query_ms}/{disconnect_ms})"
                );
                assert_eq!(backend.acquire_count(PoolLane::Primary), 1);
            }
            Err(QueryError::Abandoned) => {
                assert_eq!(
                    backend.cancel_count(),
                    1,
                    "abandoned request dispatches exactly one cancel ({query_ms}/{disconnect_ms})"
                );
                assert_eq!(backend.acquire_count(PoolLane::Primary), 2);
            }
            Err(other) => panic!("unexpected outcome {other} at {query_ms}/{disconnect_ms}"),
        }

        // Whatever the order, nothing leaks and nothing double-releases.
        assert_eq!(
            backend.release_count(PoolLane::Primary),
            backend.acquire_count(PoolLane::Primary),
            "timing {query_ms}/{disconnect_ms}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn inflight_cancellation_does_not_block_other_requests() {
    let backend = FakeBackend::new();
    backend.push_dogs(&["Rexbark Smithdog"]);
    backend.set_search_delay(Duration::from_secs(10));
    backend.set_cancel_delay(Duration::from_secs(5));
    let orch = orchestrator(&backend);

    let token_a = CancellationToken::new();
    let task_a = {
        let orch = orch.clone();
        let token = token_a.clone();
        tokio::spawn(async move { orch.run_search("bark", token).await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    token_a.cancel();

    // While request A's cancel command is still in flight, request B must
    // be able to run start to finish.
    backend.set_search_delay(Duration::from_millis(50));
    let task_b = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.run_search("bark", CancellationToken::new()).await })
    };

    let rows = task_b.await.unwrap().unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!task_a.is_finished(), "A's cancel dispatch should still be pending");

    let result_a = task_a.await.unwrap();
    assert!(matches!(result_a, Err(QueryError::Abandoned)));
    assert_eq!(backend.cancel_count(), 1);
}

// --- dispatcher lane selection and guards ---

fn pending_handle(pid: i32) -> TaskHandle {
    let handle = TaskHandle::new();
    handle.record_pid(BackendPid(pid));
    handle
}

#[tokio::test]
async fn saturated_primary_pool_fails_over_to_fallback() {
    let backend = FakeBackend::new();
    backend.set_snapshot(
        PoolLane::Primary,
        PoolSnapshot {
            active: 10,
            idle: 0,
            max: 10,
        },
    );

    let handle = pending_handle(7);
    let receipt = dispatch(&backend, &handle).await.unwrap();

    assert_eq!(receipt.lane, PoolLane::Fallback);
    assert!(receipt.delivered);
    assert_eq!(backend.acquire_count(PoolLane::Fallback), 1);
    assert_eq!(backend.acquire_count(PoolLane::Primary), 0);
    assert_eq!(backend.release_count(PoolLane::Fallback), 1);
}

#[tokio::test]
async fn primary_pool_with_an_idle_connection_is_preferred() {
    let backend = FakeBackend::new();
    backend.set_snapshot(
        PoolLane::Primary,
        PoolSnapshot {
            active: 10,
            idle: 1,
            max: 10,
        },
    );

    let handle = pending_handle(7);
    let receipt = dispatch(&backend, &handle).await.unwrap();

    assert_eq!(receipt.lane, PoolLane::Primary);
    assert_eq!(backend.acquire_count(PoolLane::Primary), 1);
    assert_eq!(backend.acquire_count(PoolLane::Fallback), 0);
}

#[tokio::test]
async fn settled_handle_is_refused_before_any_checkout() {
    let backend = FakeBackend::new();
    let handle = pending_handle(7);
    assert!(handle.try_transition(TaskState::Completed));

    let err = dispatch(&backend, &handle).await.unwrap_err();
    assert!(matches!(err, CancelError::AlreadySettled));
    assert_eq!(backend.acquire_count(PoolLane::Primary), 0);
    assert_eq!(backend.acquire_count(PoolLane::Fallback), 0);
}

#[tokio::test]
async fn missing_pid_is_refused() {
    let backend = FakeBackend::new();
    let handle = TaskHandle::new();

    let err = dispatch(&backend, &handle).await.unwrap_err();
    assert!(matches!(err, CancelError::PidUnknown));
    assert_eq!(backend.cancel_count(), 0);
}

#[tokio::test]
async fn pool_exhaustion_on_the_chosen_lane_is_reported_not_retried() {
    let backend = FakeBackend::new();
    backend.set_snapshot(
        PoolLane::Primary,
        PoolSnapshot {
            active: 10,
            idle: 0,
            max: 10,
        },
    );
    backend.set_fail_acquire(PoolLane::Fallback);

    let handle = pending_handle(7);
    let err = dispatch(&backend, &handle).await.unwrap_err();

    assert!(matches!(
        err,
        CancelError::AcquireConnection {
            lane: PoolLane::Fallback,
            ..
        }
    ));
    assert_eq!(backend.cancel_count(), 0);
}
