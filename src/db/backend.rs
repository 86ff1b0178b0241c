//! Backend connection seam.
//!
//! # Responsibilities
//! - Define the `QueryBackend`/`BackendConn` traits the orchestrator and
//!   dispatcher are written against
//! - Implement them over the deadpool-postgres pools
//!
//! # Design Decisions
//! - The seam exists so the cancellation machinery can be exercised in
//!   tests with an in-memory backend; production code only ever sees the
//!   Postgres implementation
//! - Connections release on drop. Exactly-once release is therefore
//!   ownership, not bookkeeping; what the callers control is *when* the
//!   drop happens relative to the cancel attempt

use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::Object;
use uuid::Uuid;

use crate::db::monitor::PoolSnapshot;
use crate::db::pool::DbPools;
use crate::db::DbError;
use crate::records::Dog;

/// Which pool a connection is checked out from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolLane {
    Primary,
    Fallback,
}

impl std::fmt::Display for PoolLane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolLane::Primary => write!(f, "primary"),
            PoolLane::Fallback => write!(f, "fallback"),
        }
    }
}

/// Identifier Postgres assigns to the server process behind one connection.
/// Usable as a cancel target only while that process still runs the task
/// it was recorded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendPid(pub i32);

impl std::fmt::Display for BackendPid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A source of dedicated backend connections plus pool introspection.
#[async_trait]
pub trait QueryBackend: Send + Sync + 'static {
    type Conn: BackendConn;

    /// Check out a dedicated connection from the given lane.
    async fn acquire(&self, lane: PoolLane) -> Result<Self::Conn, DbError>;

    /// Point-in-time snapshot of the given lane's pool. Must not block or
    /// check out connections.
    fn snapshot(&self, lane: PoolLane) -> PoolSnapshot;
}

/// One dedicated backend connection. Dropping it returns it to its pool.
#[async_trait]
pub trait BackendConn: Send + 'static {
    /// The backend-assigned identifier of this connection's server process.
    async fn backend_pid(&mut self) -> Result<BackendPid, DbError>;

    /// Run the bounded substring search. `pattern` is a ready ILIKE
    /// pattern (wildcards included by the caller).
    async fn search_dogs(&mut self, pattern: &str, limit: i64) -> Result<Vec<Dog>, DbError>;

    /// Ask the backend to cancel the task running on `pid`'s process.
    /// Returns whether the backend accepted the request.
    async fn cancel_backend(&mut self, pid: BackendPid) -> Result<bool, DbError>;

    /// Bulk-insert one chunk of seed rows.
    async fn insert_dogs(&mut self, names: &[String]) -> Result<u64, DbError>;

    /// Total rows in the `dogs` table.
    async fn count_dogs(&mut self) -> Result<i64, DbError>;
}

/// Production backend over the primary/fallback Postgres pools.
pub struct PgBackend {
    pools: DbPools,
}

impl PgBackend {
    pub fn new(pools: DbPools) -> Self {
        Self { pools }
    }

    /// Create the `dogs` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), DbError> {
        let client = self.pools.pool(PoolLane::Primary).get().await?;
        client
            .batch_execute(
                "
            CREATE TABLE IF NOT EXISTS dogs (
                id UUID PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            );",
            )
            .await?;
        tracing::info!("Database schema ensured");
        Ok(())
    }
}

#[async_trait]
impl QueryBackend for PgBackend {
    type Conn = PgConn;

    async fn acquire(&self, lane: PoolLane) -> Result<PgConn, DbError> {
        let client = self.pools.pool(lane).get().await?;
        Ok(PgConn { client })
    }

    fn snapshot(&self, lane: PoolLane) -> PoolSnapshot {
        self.pools.snapshot(lane)
    }
}

/// A checked-out Postgres connection.
pub struct PgConn {
    client: Object,
}

#[async_trait]
impl BackendConn for PgConn {
    async fn backend_pid(&mut self) -> Result<BackendPid, DbError> {
        let row = self
            .client
            .query_one("SELECT pg_backend_pid()", &[])
            .await?;
        Ok(BackendPid(row.get(0)))
    }

    async fn search_dogs(&mut self, pattern: &str, limit: i64) -> Result<Vec<Dog>, DbError> {
        let rows = self
            .client
            .query(
                "SELECT id, name, created_at, updated_at FROM dogs \
                 WHERE name ILIKE $1 ORDER BY name LIMIT $2",
                &[&pattern, &limit],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| Dog {
                id: row.get(0),
                name: row.get(1),
                created_at: row.get(2),
                updated_at: row.get(3),
            })
            .collect())
    }

    async fn cancel_backend(&mut self, pid: BackendPid) -> Result<bool, DbError> {
        let row = self
            .client
            .query_one("SELECT pg_cancel_backend($1)", &[&pid.0])
            .await?;
        Ok(row.get(0))
    }

    async fn insert_dogs(&mut self, names: &[String]) -> Result<u64, DbError> {
        let ids: Vec<Uuid> = names.iter().map(|_| Uuid::new_v4()).collect();
        let now = Utc::now();
        let inserted = self
            .client
            .execute(
                "INSERT INTO dogs (id, name, created_at, updated_at) \
                 SELECT id, name, $3, $3 FROM UNNEST($1::uuid[], $2::text[]) AS t(id, name)",
                &[&ids, &names, &now],
            )
            .await?;
        Ok(inserted)
    }

    async fn count_dogs(&mut self) -> Result<i64, DbError> {
        let row = self.client.query_one("SELECT COUNT(*) FROM dogs", &[]).await?;
        Ok(row.get(0))
    }
}
