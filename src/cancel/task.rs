//! Cancelable task handle.
//!
//! # Responsibilities
//! - Hold the backend pid captured at connect time for the cleanup path
//! - Enforce the single terminal transition per request
//!
//! # Design Decisions
//! - The pid lives in a shared write-once slot, not a closure variable, so
//!   the cleanup path still sees it when it was captured asynchronously
//! - Terminal state is an AtomicU8 settled by compare-exchange; the
//!   transition winner runs the side effects, losers observe and stand down

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

use crate::db::BackendPid;

/// Lifecycle of one request's backend task.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Started, no result yet, client still connected.
    Pending = 0,
    /// Result emitted to the client.
    Completed = 1,
    /// Error surfaced to the client.
    Failed = 2,
    /// Client disconnected while still pending.
    Abandoned = 3,
}

impl From<u8> for TaskState {
    fn from(val: u8) -> Self {
        match val {
            1 => TaskState::Completed,
            2 => TaskState::Failed,
            3 => TaskState::Abandoned,
            _ => TaskState::Pending,
        }
    }
}

/// Handle for one in-flight backend operation.
#[derive(Debug)]
pub struct TaskHandle {
    state: AtomicU8,
    pid: OnceLock<BackendPid>,
}

impl TaskHandle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(TaskState::Pending as u8),
            pid: OnceLock::new(),
        }
    }

    /// Record the backend pid once, under Pending only. Later writes are
    /// ignored and logged.
    pub fn record_pid(&self, pid: BackendPid) {
        if self.pid.set(pid).is_err() {
            tracing::warn!(pid = %pid, "Backend pid already recorded, ignoring");
        }
    }

    /// The pid captured at connect time, if the handshake got that far.
    pub fn backend_pid(&self) -> Option<BackendPid> {
        self.pid.get().copied()
    }

    pub fn state(&self) -> TaskState {
        TaskState::from(self.state.load(Ordering::Acquire))
    }

    /// True once the primary operation settled (success or failure).
    /// Cancellation must never be attempted past this point: the backend
    /// may have recycled the pid to an unrelated task.
    pub fn is_settled(&self) -> bool {
        matches!(self.state(), TaskState::Completed | TaskState::Failed)
    }

    /// Attempt the Pending → `to` transition. Returns true for the single
    /// winner; every later attempt, with any target, returns false.
    pub fn try_transition(&self, to: TaskState) -> bool {
        debug_assert!(to != TaskState::Pending);
        self.state
            .compare_exchange(
                TaskState::Pending as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

impl Default for TaskHandle {
    fn default() -> Self {
        Self::new()
    }
}
