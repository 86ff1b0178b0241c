//! Cancellation subsystem.
//!
//! # Data Flow
//! ```text
//! orchestrator starts a query
//!     → task.rs (handle: pid slot + terminal state machine)
//!     → client disconnects before the query settles
//!     → dispatcher.rs (pick pool via monitor, new connection,
//!       SELECT pg_cancel_backend(pid), release)
//! ```
//!
//! # Design Decisions
//! - Cancellation is cooperative at the backend: dropping the local
//!   connection object does not stop server-side work, so the backend is
//!   asked to stop via a side-channel command on a different connection
//! - At-most-one attempt, best effort: no retries, no confirmation wait
//! - Dispatch failures are an observability concern only; the client that
//!   would care is already gone

pub mod dispatcher;
pub mod task;

use thiserror::Error;

pub use dispatcher::{dispatch, CancelReceipt};
pub use task::{TaskHandle, TaskState};

/// Errors from the best-effort cancel path. Logged, never surfaced.
#[derive(Debug, Error)]
pub enum CancelError {
    /// The task settled before dispatch ran; cancelling now could hit an
    /// unrelated task that inherited the pid.
    #[error("task already settled, refusing to cancel")]
    AlreadySettled,

    /// The task never captured a backend pid, so there is nothing to target.
    #[error("no backend pid recorded for task")]
    PidUnknown,

    /// Could not check out a cancellation connection, even from the
    /// fallback pool.
    #[error("failed to acquire cancellation connection from {lane} pool: {source}")]
    AcquireConnection {
        lane: crate::db::PoolLane,
        source: crate::db::DbError,
    },

    /// The cancel command itself failed on the wire.
    #[error("cancel command failed on {lane} pool: {source}")]
    Command {
        lane: crate::db::PoolLane,
        source: crate::db::DbError,
    },
}
