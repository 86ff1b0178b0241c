//! Pool capacity monitoring.
//!
//! # Responsibilities
//! - Read a pool's live state into a point-in-time snapshot
//! - Decide whether a pool has spare capacity for an out-of-band checkout
//!
//! # Design Decisions
//! - Snapshots are never cached; every dispatch decision re-reads the pool
//! - Pure functions of the snapshot: no locking, no side effects, no
//!   connection checkout. The read is racy by contract and callers must
//!   tolerate the snapshot going stale immediately

use deadpool_postgres::Pool;
use serde::Serialize;

/// Point-in-time view of one pool.
///
/// `active` counts every live connection (checked out or idle), `idle`
/// counts the idle subset, `max` is the pool's configured ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolSnapshot {
    pub active: usize,
    pub idle: usize,
    pub max: usize,
}

impl PoolSnapshot {
    /// Connections obtainable right now without blocking: idle ones plus
    /// headroom under the pool maximum.
    pub fn spare_capacity(&self) -> usize {
        self.idle + self.max.saturating_sub(self.active)
    }

    /// True when a checkout would have to wait.
    pub fn is_at_capacity(&self) -> bool {
        self.spare_capacity() == 0
    }
}

/// Read the pool's current status. Never blocks.
pub fn snapshot(pool: &Pool) -> PoolSnapshot {
    let status = pool.status();
    PoolSnapshot {
        active: status.size,
        idle: status.available,
        max: status.max_size,
    }
}
