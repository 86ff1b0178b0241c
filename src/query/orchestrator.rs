//! The per-request composition root.
//!
//! # Responsibilities
//! - Wire connection acquisition, pid capture, query execution, completion
//!   detection and cancellation into one flow with guaranteed cleanup
//! - Keep the in-flight registry the status endpoint reports from
//!
//! # Design Decisions
//! - The disconnect signal and the query's own completion race; the single
//!   CAS on the task handle decides the terminal state, the loser is
//!   observed and ignored, never cancelled locally
//! - On abandonment the dedicated connection outlives the cancel attempt:
//!   it stays checked out until this function returns, after dispatch has
//!   run, which narrows the pid-reuse window

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::cancel::task::{TaskHandle, TaskState};
use crate::cancel::{dispatcher, CancelError};
use crate::db::{BackendConn, BackendPid, PoolLane, QueryBackend};
use crate::observability::metrics;
use crate::query::QueryError;
use crate::records::Dog;

struct InflightEntry {
    pattern: String,
    started_at: Instant,
}

/// Public view of one in-flight query, as reported by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct InflightQuery {
    pub pid: i32,
    pub pattern: String,
    pub elapsed_ms: u64,
}

/// Runs cancelable queries against one backend.
pub struct Orchestrator<B: QueryBackend> {
    backend: Arc<B>,
    result_limit: i64,
    inflight: DashMap<i32, InflightEntry>,
}

impl<B: QueryBackend> Orchestrator<B> {
    pub fn new(backend: Arc<B>, result_limit: i64) -> Self {
        Self {
            backend,
            result_limit,
            inflight: DashMap::new(),
        }
    }

    /// Queries currently running on a dedicated connection, cancel attempt
    /// included for abandoned ones that are still being dispatched.
    pub fn inflight(&self) -> Vec<InflightQuery> {
        self.inflight
            .iter()
            .map(|entry| InflightQuery {
                pid: *entry.key(),
                pattern: entry.value().pattern.clone(),
                elapsed_ms: entry.value().started_at.elapsed().as_millis() as u64,
            })
            .collect()
    }

    /// Run the bounded substring search, cancelable through `disconnect`.
    ///
    /// Terminal outcomes map one-to-one onto the return value: `Ok` is
    /// Completed, `Err(Backend)` is Failed, `Err(Abandoned)` means the
    /// token fired first and the backend cancel was dispatched. Acquisition
    /// failures happen before a task exists and are plain errors.
    pub async fn run_search(
        &self,
        raw_pattern: &str,
        disconnect: CancellationToken,
    ) -> Result<Vec<Dog>, QueryError> {
        let start = Instant::now();
        let handle = TaskHandle::new();

        let mut conn = match self.backend.acquire(PoolLane::Primary).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(error = %e, "Failed to acquire dedicated connection");
                metrics::record_search("acquire_error", start);
                return Err(QueryError::AcquireConnection(e));
            }
        };

        let pid = match conn.backend_pid().await {
            Ok(pid) => pid,
            Err(e) => {
                handle.try_transition(TaskState::Failed);
                tracing::error!(error = %e, "Failed to read backend pid");
                metrics::record_search("error", start);
                return Err(QueryError::Backend(e));
            }
        };
        handle.record_pid(pid);
        tracing::debug!(pid = %pid, "Connected, captured backend pid");

        let _inflight = InflightGuard::insert(&self.inflight, pid, raw_pattern);

        let pattern = format!("%{}%", raw_pattern);
        let query = conn.search_dogs(&pattern, self.result_limit);
        tokio::pin!(query);

        tokio::select! {
            // A query that is already settled beats a simultaneous disconnect.
            biased;

            result = &mut query => match result {
                Ok(dogs) => {
                    handle.try_transition(TaskState::Completed);
                    tracing::debug!(pid = %pid, rows = dogs.len(), "Query completed");
                    metrics::record_search("ok", start);
                    Ok(dogs)
                }
                Err(e) => {
                    handle.try_transition(TaskState::Failed);
                    tracing::error!(pid = %pid, error = %e, "Query failed");
                    metrics::record_search("error", start);
                    Err(QueryError::Backend(e))
                }
            },

            _ = disconnect.cancelled() => {
                if handle.try_transition(TaskState::Abandoned) {
                    tracing::info!(pid = %pid, "Client disconnected before query settled, cancelling");
                    metrics::record_abandoned();
                    match dispatcher::dispatch(self.backend.as_ref(), &handle).await {
                        Ok(receipt) => {
                            tracing::debug!(
                                pid = %pid,
                                lane = %receipt.lane,
                                delivered = receipt.delivered,
                                "Cancel dispatch finished"
                            );
                        }
                        // Best effort: nobody is connected to care, so this
                        // is logged and dropped.
                        Err(e @ CancelError::AlreadySettled) => {
                            tracing::debug!(pid = %pid, reason = %e, "Cancel dispatch skipped");
                        }
                        Err(e) => {
                            tracing::error!(pid = %pid, error = %e, "Cancel dispatch failed");
                        }
                    }
                }
                // The dedicated connection is still checked out here; it is
                // released when this function returns, after the cancel
                // attempt above. Releasing it earlier would widen the
                // pid-reuse window.
                metrics::record_search("abandoned", start);
                Err(QueryError::Abandoned)
            }
        }
    }
}

/// Registry entry that removes itself when the request is done with its
/// dedicated connection.
struct InflightGuard<'a> {
    registry: &'a DashMap<i32, InflightEntry>,
    pid: i32,
}

impl<'a> InflightGuard<'a> {
    fn insert(
        registry: &'a DashMap<i32, InflightEntry>,
        pid: BackendPid,
        pattern: &str,
    ) -> Self {
        registry.insert(
            pid.0,
            InflightEntry {
                pattern: pattern.to_string(),
                started_at: Instant::now(),
            },
        );
        Self {
            registry,
            pid: pid.0,
        }
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.registry.remove(&self.pid);
    }
}
