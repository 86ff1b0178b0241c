//! Shutdown coordination for the service.
//!
//! In-flight cancel dispatches run on detached tasks, so draining the HTTP
//! server is all shutdown has to coordinate: pending requests either settle
//! or get abandoned by their clients, and the pools close with the process.

use tokio::sync::broadcast;

use crate::lifecycle::signals;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Spawn a task that triggers shutdown on SIGINT/SIGTERM, consuming the
    /// coordinator. Subscribers created beforehand keep working.
    pub fn trigger_on_signals(self) {
        tokio::spawn(async move {
            signals::wait_for_signal().await;
            self.trigger();
        });
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
