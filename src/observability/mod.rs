//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Cancellation failures are visible ONLY here: by the time the cancel
//!   path can fail, the client that asked for the work is gone
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
