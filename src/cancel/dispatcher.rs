//! Cancellation dispatch.
//!
//! # Responsibilities
//! - Pick the pool lane for the cancel command (primary, or fallback when
//!   the primary has no spare capacity)
//! - Check out a fresh dedicated connection and issue
//!   `pg_cancel_backend(pid)`
//! - Release that connection exactly once, whatever happened
//!
//! Known race, documented rather than fixed: between the client
//! disconnecting and the cancel command reaching the backend, the original
//! task may finish and the backend may hand its pid to an unrelated task.
//! The mitigation is procedural (the task's own connection is released
//! only after this dispatch returns), which narrows the window without
//! closing it. The backend's pid reuse policy is outside our control.

use crate::cancel::task::TaskHandle;
use crate::cancel::CancelError;
use crate::db::{BackendConn, PoolLane, QueryBackend};
use crate::observability::metrics;

/// What a successful dispatch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelReceipt {
    /// The pool the cancellation connection came from.
    pub lane: PoolLane,
    /// Whether the backend accepted the cancel request. `false` usually
    /// means the target process was already gone.
    pub delivered: bool,
}

/// Issue the backend-native cancel command for `handle`'s task.
///
/// Callable only from the cleanup path, once, for an unsettled handle with
/// a recorded pid. The task's own connection is never reused here: it is
/// busy running the very operation being cancelled.
pub async fn dispatch<B: QueryBackend>(
    backend: &B,
    handle: &TaskHandle,
) -> Result<CancelReceipt, CancelError> {
    if handle.is_settled() {
        return Err(CancelError::AlreadySettled);
    }
    let pid = handle.backend_pid().ok_or(CancelError::PidUnknown)?;

    // The snapshot is read at decision time, never cached. It only picks
    // the lane; the attempt itself happens regardless.
    let primary = backend.snapshot(PoolLane::Primary);
    let lane = if primary.is_at_capacity() {
        tracing::debug!(
            active = primary.active,
            max = primary.max,
            "Primary pool at capacity, using fallback for cancel"
        );
        PoolLane::Fallback
    } else {
        PoolLane::Primary
    };

    let mut conn = backend
        .acquire(lane)
        .await
        .map_err(|source| CancelError::AcquireConnection { lane, source })?;

    let result = conn.cancel_backend(pid).await;
    // Checked out for this one command; released on drop no matter how
    // the command went.
    drop(conn);

    match result {
        Ok(delivered) => {
            if delivered {
                tracing::info!(pid = %pid, lane = %lane, "Cancelled backend query");
            } else {
                tracing::info!(pid = %pid, lane = %lane, "Backend reported no such task, query likely finished");
            }
            metrics::record_cancel(lane, "ok");
            Ok(CancelReceipt { lane, delivered })
        }
        Err(source) => {
            metrics::record_cancel(lane, "error");
            Err(CancelError::Command { lane, source })
        }
    }
}
