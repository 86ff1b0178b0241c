//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, request timeout)
//! - Bind the server to a listener and drive graceful shutdown
//!
//! The request timeout layer rides the same abandonment path as a client
//! disconnect: on timeout the handler future is dropped, the disconnect
//! guard fires, and the backend query is cancelled.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::db::QueryBackend;
use crate::http::handlers;
use crate::query::Orchestrator;

/// Application state injected into handlers.
pub struct AppState<B: QueryBackend> {
    pub orchestrator: Arc<Orchestrator<B>>,
    pub backend: Arc<B>,
    pub seed_chunk_size: usize,
}

// Manual impl: `B` itself is never cloned, only the Arcs are.
impl<B: QueryBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: self.orchestrator.clone(),
            backend: self.backend.clone(),
            seed_chunk_size: self.seed_chunk_size,
        }
    }
}

/// HTTP server for the dogsearch service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server over the given backend.
    pub fn new<B: QueryBackend>(config: &ServiceConfig, backend: Arc<B>) -> Self {
        let orchestrator = Arc::new(Orchestrator::new(
            backend.clone(),
            config.search.result_limit,
        ));

        let state = AppState {
            orchestrator,
            backend,
            seed_chunk_size: config.search.seed_chunk_size,
        };

        let router = Self::build_router(config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router<B: QueryBackend>(config: &ServiceConfig, state: AppState<B>) -> Router {
        Router::new()
            .route("/dogs", get(handlers::search_dogs::<B>))
            .route("/seed", post(handlers::seed_dogs::<B>))
            .route("/healthz", get(handlers::healthz::<B>))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
