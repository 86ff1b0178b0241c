//! Per-request query orchestration.
//!
//! # Data Flow
//! ```text
//! handler (with disconnect token)
//!     → orchestrator.rs
//!         acquire dedicated connection
//!         → capture backend pid into the task handle
//!         → race query completion against the disconnect token
//!             settled first → Completed/Failed, result surfaced
//!             token first   → Abandoned, cancel dispatched, connection
//!                             released last
//! ```

pub mod orchestrator;

use thiserror::Error;

pub use orchestrator::{InflightQuery, Orchestrator};

use crate::db::DbError;

/// Errors surfaced from a cancelable query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// No dedicated connection could be obtained. Fatal to the request;
    /// no cancellation is attempted because no task ever started.
    #[error("failed to acquire backend connection: {0}")]
    AcquireConnection(DbError),

    /// The primary operation itself failed. Surfaced to the client if one
    /// is still listening.
    #[error("backend query failed: {0}")]
    Backend(DbError),

    /// The client disconnected before the query settled. Nobody is left
    /// to receive this; it exists so the spawned task has a truthful
    /// return value.
    #[error("request abandoned by client")]
    Abandoned,
}
