//! Disconnect-triggered cancellation signal.
//!
//! # Responsibilities
//! - Bridge the transport-level "client went away" event into a generic
//!   cancellation token the orchestrator can race against
//! - Fire exactly once, and only when the request did not settle first
//!
//! # Design Decisions
//! - In axum/hyper a client disconnect surfaces as the handler future
//!   being dropped. The handler arms a guard before awaiting the query
//!   task and defuses it once a result is in hand; a drop of the armed
//!   guard is therefore precisely "the client disconnected while pending"
//! - The token is from tokio-util: cancellation is level-triggered and
//!   idempotent, so a re-entrant close event cannot fire the path twice

use tokio_util::sync::CancellationToken;

/// Per-request disconnect signal source.
pub struct DisconnectSignal {
    token: CancellationToken,
}

impl DisconnectSignal {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// The token the orchestrator races the query against.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Arm the guard. While armed, dropping it cancels the token.
    pub fn into_guard(self) -> DisconnectGuard {
        DisconnectGuard {
            token: self.token,
            defused: false,
        }
    }
}

impl Default for DisconnectSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII bridge from handler-future drop to token cancellation.
pub struct DisconnectGuard {
    token: CancellationToken,
    defused: bool,
}

impl DisconnectGuard {
    /// The request settled while the client was still connected; a later
    /// drop must not cancel anything.
    pub fn defuse(&mut self) {
        self.defused = true;
    }
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if !self.defused {
            self.token.cancel();
        }
    }
}
