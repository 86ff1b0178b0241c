//! Dog record types shared by the HTTP surface and the database layer.

pub mod seed;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single row from the `dogs` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dog {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a seeding run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedSummary {
    /// Rows inserted by this run.
    pub seeded_count: u64,
    /// Total rows in the table afterwards.
    pub final_count: i64,
}
