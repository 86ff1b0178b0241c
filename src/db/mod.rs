//! Database access subsystem.
//!
//! # Data Flow
//! ```text
//! config (DatabaseConfig)
//!     → pool.rs (primary + fallback deadpool pools)
//!     → backend.rs (QueryBackend/BackendConn seam over the pools)
//!     → monitor.rs (point-in-time pool snapshots for dispatch decisions)
//! ```
//!
//! # Design Decisions
//! - Two pools with one URL: the fallback pool exists solely so the
//!   cancellation side-channel can still check out a connection when
//!   normal traffic has saturated the primary pool
//! - Pool snapshots are racy by contract; checkout/checkin atomicity is
//!   the pool implementation's job, not ours

pub mod backend;
pub mod monitor;
pub mod pool;

use thiserror::Error;

pub use backend::{BackendConn, BackendPid, PgBackend, PoolLane, QueryBackend};
pub use monitor::PoolSnapshot;
pub use pool::DbPools;

/// Errors from the database layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// Could not check out a connection from a pool.
    #[error("failed to check out connection: {0}")]
    Checkout(String),

    /// A statement failed on an established connection.
    #[error("query failed: {0}")]
    Query(String),
}

impl From<deadpool_postgres::PoolError> for DbError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        DbError::Checkout(err.to_string())
    }
}

impl From<tokio_postgres::Error> for DbError {
    fn from(err: tokio_postgres::Error) -> Self {
        DbError::Query(err.to_string())
    }
}
