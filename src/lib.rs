//! Dogsearch: a cancelable query service
//!
//! An HTTP service whose point is what happens when a client gives up: an
//! aborted request cancels the Postgres query running on its behalf via
//! `pg_cancel_backend`, issued over a separate side-channel connection.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌────────────────────────────────────────────────────┐
//!                        │                 DOGSEARCH SERVICE                   │
//!                        │                                                     │
//!   GET /dogs?search=    │  ┌─────────┐    ┌──────────────┐    ┌───────────┐  │
//!   ─────────────────────┼─▶│  http   │───▶│ disconnect   │───▶│   query   │  │
//!                        │  │ server  │    │ guard        │    │orchestrator│ │
//!                        │  └─────────┘    └──────────────┘    └─────┬─────┘  │
//!                        │                                           │        │
//!                        │                  client gone?             ▼        │
//!                        │  ┌──────────────┐   yes   ┌──────────────────┐    │
//!                        │  │    cancel    │◀────────│  dedicated conn  │◀───┼── Postgres
//!                        │  │  dispatcher  │         │  (primary pool)  │    │
//!                        │  └──────┬───────┘         └──────────────────┘    │
//!                        │         │ pg_cancel_backend(pid)                   │
//!                        │         ▼                                          │
//!                        │  ┌──────────────────┐  pool monitor picks         │
//!                        │  │ primary/fallback │  the lane with spare        │
//!                        │  │   cancel conn    │  capacity                   │
//!                        │  └──────────────────┘                             │
//!                        │                                                    │
//!                        │  Cross-cutting: config, observability, lifecycle   │
//!                        └────────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod cancel;
pub mod db;
pub mod http;
pub mod query;
pub mod records;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
