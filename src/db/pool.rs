//! Connection pool construction.
//!
//! # Responsibilities
//! - Build the primary and fallback deadpool-postgres pools from config
//! - Hand out lane-addressed pool references
//! - Expose point-in-time snapshots via the monitor

use std::str::FromStr;

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;

use crate::config::DatabaseConfig;
use crate::db::backend::PoolLane;
use crate::db::monitor::{self, PoolSnapshot};
use crate::db::DbError;

/// The primary pool (normal traffic) plus the fallback pool reserved for
/// cancellation dispatch when the primary is saturated.
pub struct DbPools {
    primary: Pool,
    fallback: Pool,
}

impl DbPools {
    /// Build both pools against the same database URL.
    pub fn connect(config: &DatabaseConfig) -> Result<Self, DbError> {
        let pg_config = tokio_postgres::Config::from_str(&config.url)
            .map_err(|e| DbError::Checkout(format!("invalid database url: {e}")))?;

        let primary = Self::build_pool(&pg_config, config.pool_max)?;
        let fallback = Self::build_pool(&pg_config, config.fallback_pool_max)?;

        tracing::info!(
            pool_max = config.pool_max,
            fallback_pool_max = config.fallback_pool_max,
            "Database pools created"
        );

        Ok(Self { primary, fallback })
    }

    fn build_pool(pg_config: &tokio_postgres::Config, max_size: usize) -> Result<Pool, DbError> {
        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(pg_config.clone(), NoTls, mgr_config);
        Pool::builder(mgr)
            .max_size(max_size)
            .build()
            .map_err(|e| DbError::Checkout(e.to_string()))
    }

    /// The pool behind the given lane.
    pub fn pool(&self, lane: PoolLane) -> &Pool {
        match lane {
            PoolLane::Primary => &self.primary,
            PoolLane::Fallback => &self.fallback,
        }
    }

    /// Point-in-time snapshot of the given lane's pool.
    pub fn snapshot(&self, lane: PoolLane) -> PoolSnapshot {
        monitor::snapshot(self.pool(lane))
    }
}
