//! HTTP surface of the service.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → handlers.rs (search / seed / healthz)
//!     → disconnect.rs (client-gone signal for the cancelable search)
//! ```

pub mod disconnect;
pub mod handlers;
pub mod server;

pub use disconnect::{DisconnectGuard, DisconnectSignal};
pub use server::{AppState, HttpServer};
