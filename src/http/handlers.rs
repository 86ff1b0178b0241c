//! Request handlers.
//!
//! # Responsibilities
//! - Translate HTTP requests into orchestrator/seeder calls
//! - Arm the disconnect guard around the cancelable search
//! - Map domain errors onto status codes

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::{DbError, PoolLane, PoolSnapshot, QueryBackend};
use crate::http::disconnect::DisconnectSignal;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::query::{InflightQuery, QueryError};
use crate::records::seed;
use crate::records::{Dog, SeedSummary};

/// Query string for `GET /dogs`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Substring to match against dog names. Empty matches everything.
    pub search: Option<String>,
}

/// Query string for `POST /seed`.
#[derive(Debug, Deserialize)]
pub struct SeedParams {
    pub count: u64,
}

/// Error payload returned to still-connected clients.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        let status = match err {
            QueryError::AcquireConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
            QueryError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // Nobody receives this response; 499 keeps the access log honest.
            QueryError::Abandoned => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        Self::internal(err.to_string())
    }
}

/// `GET /dogs?search=`: the cancelable search.
///
/// The query runs on a spawned task so that it survives this handler being
/// dropped on client disconnect; the armed guard is what tells the task the
/// client is gone.
pub async fn search_dogs<B: QueryBackend>(
    State(state): State<AppState<B>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Dog>>, ApiError> {
    let pattern = params.search.unwrap_or_default();
    tracing::debug!(pattern = %pattern, "Search request");

    let signal = DisconnectSignal::new();
    let token = signal.token();
    let mut guard = signal.into_guard();

    let orchestrator = state.orchestrator.clone();
    let task = tokio::spawn(async move { orchestrator.run_search(&pattern, token).await });

    // If the client disconnects, this await never finishes: the handler
    // future is dropped, the guard fires, and the spawned task runs the
    // abandonment path on its own.
    let joined = task.await;
    guard.defuse();

    match joined {
        Ok(Ok(dogs)) => Ok(Json(dogs)),
        Ok(Err(err)) => Err(err.into()),
        Err(err) => {
            tracing::error!(error = %err, "Search task failed to join");
            Err(ApiError::internal("search task failed"))
        }
    }
}

/// `POST /seed?count=`: populate the table with synthetic rows.
pub async fn seed_dogs<B: QueryBackend>(
    State(state): State<AppState<B>>,
    Query(params): Query<SeedParams>,
) -> Result<Json<SeedSummary>, ApiError> {
    tracing::info!(count = params.count, "Seed request");
    let summary = seed::run(state.backend.as_ref(), params.count, state.seed_chunk_size).await?;
    metrics::record_seed(summary.seeded_count);
    Ok(Json(summary))
}

/// Body of `GET /healthz`.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub status: &'static str,
    pub primary_pool: PoolSnapshot,
    pub fallback_pool: PoolSnapshot,
    pub inflight: Vec<InflightQuery>,
}

/// `GET /healthz`: pool snapshots plus the in-flight query registry.
pub async fn healthz<B: QueryBackend>(State(state): State<AppState<B>>) -> Json<StatusReport> {
    Json(StatusReport {
        status: "ok",
        primary_pool: state.backend.snapshot(PoolLane::Primary),
        fallback_pool: state.backend.snapshot(PoolLane::Fallback),
        inflight: state.orchestrator.inflight(),
    })
}
