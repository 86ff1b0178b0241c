//! Synthetic data generation for the `dogs` table.
//!
//! # Responsibilities
//! - Generate dog names from embedded word lists
//! - Insert rows in chunks so large seeds don't build one giant statement
//! - Report progress per chunk

use rand::Rng;

use crate::db::backend::{BackendConn, PoolLane, QueryBackend};
use crate::db::DbError;
use crate::records::SeedSummary;

const FIRST_NAMES: &[&str] = &[
    "Rex", "Luna", "Max", "Bella", "Charlie", "Daisy", "Buddy", "Molly", "Rocky", "Sadie",
    "Duke", "Maggie", "Bear", "Sophie", "Tucker", "Chloe", "Jack", "Penny", "Cooper", "Rosie",
    "Milo", "Ruby", "Oscar", "Willow",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Jones", "Miller", "Garcia", "Davis", "Wilson", "Moore", "Taylor", "Anderson",
    "Thomas", "Jackson", "White", "Harris", "Martin", "Thompson", "Young", "Walker", "Hall",
    "Allen", "King", "Wright", "Scott", "Green", "Baker",
];

/// Generate one dog name in the corpus shape, e.g. "Rexbark Smithdog".
///
/// The fixed suffixes keep substring searches like "bark" cheap to satisfy
/// and expensive to exhaust, which is what the cancelable search endpoint
/// needs to demonstrate.
pub fn generate_name<R: Rng>(rng: &mut R) -> String {
    let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
    let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
    format!("{first}bark {last}dog")
}

/// Insert `total_count` synthetic dogs in chunks of `chunk_size`.
pub async fn run<B: QueryBackend>(
    backend: &B,
    total_count: u64,
    chunk_size: usize,
) -> Result<SeedSummary, DbError> {
    let mut conn = backend.acquire(PoolLane::Primary).await?;
    let mut seeded: u64 = 0;

    while seeded < total_count {
        let current = std::cmp::min(chunk_size as u64, total_count - seeded) as usize;
        // ThreadRng is not Send, so it must not live across the insert await.
        let names: Vec<String> = {
            let mut rng = rand::thread_rng();
            (0..current).map(|_| generate_name(&mut rng)).collect()
        };

        conn.insert_dogs(&names).await?;
        seeded += current as u64;

        tracing::info!(
            seeded,
            total = total_count,
            "Seeded dogs chunk"
        );
    }

    let final_count = conn.count_dogs().await?;
    tracing::info!(
        seeded,
        final_count,
        "Seeding complete"
    );

    Ok(SeedSummary {
        seeded_count: seeded,
        final_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_follow_corpus_shape() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let name = generate_name(&mut rng);
            let mut parts = name.split(' ');
            let first = parts.next().unwrap();
            let last = parts.next().unwrap();
            assert!(parts.next().is_none());
            assert!(first.ends_with("bark"));
            assert!(last.ends_with("dog"));
        }
    }
}
