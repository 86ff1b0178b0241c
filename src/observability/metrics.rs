//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define service metrics (searches, abandonments, cancel dispatches)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `dogsearch_requests_total` (counter): searches by outcome
//! - `dogsearch_request_duration_seconds` (histogram): search latency
//! - `dogsearch_abandoned_total` (counter): client-disconnect abandonments
//! - `dogsearch_cancel_dispatch_total` (counter): cancel commands by pool
//!   lane and outcome
//! - `dogsearch_seeded_rows_total` (counter): rows inserted by seeding

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::db::PoolLane;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished (or failed, or abandoned) search request.
pub fn record_search(outcome: &str, start: Instant) {
    counter!("dogsearch_requests_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("dogsearch_request_duration_seconds", "outcome" => outcome.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record one Pending → Abandoned transition.
pub fn record_abandoned() {
    counter!("dogsearch_abandoned_total").increment(1);
}

/// Record one cancel-command dispatch attempt.
pub fn record_cancel(lane: PoolLane, outcome: &str) {
    counter!(
        "dogsearch_cancel_dispatch_total",
        "lane" => lane.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record rows inserted by a seeding run.
pub fn record_seed(count: u64) {
    counter!("dogsearch_seeded_rows_total").increment(count);
}
