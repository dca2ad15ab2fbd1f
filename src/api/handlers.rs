//! API request handlers

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::{
    config::Config,
    embedding::{DelegateFactory, EmbedResult},
    error::{EmbedderError, ErrorKind, Result},
    middleware::{BearerAuth, InputValidator},
    observability::{HealthResponse, MetricsCollector},
    reclaim::{ReclaimGuard, ResourceReclaimer},
};

/// Application state, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<BearerAuth>,
    pub factory: Arc<dyn DelegateFactory>,
    pub reclaimer: Arc<ResourceReclaimer>,
    pub metrics: Arc<MetricsCollector>,
    pub default_model: Arc<str>,
}

impl AppState {
    /// Wire the state from configuration and a delegate factory
    pub fn new(config: &Config, factory: Arc<dyn DelegateFactory>) -> Self {
        let metrics = Arc::new(MetricsCollector::new());
        let reclaimer = ResourceReclaimer::from_config(&config.reclaim).with_metrics(metrics.clone());

        Self {
            auth: Arc::new(BearerAuth::new(&config.auth)),
            factory,
            reclaimer: Arc::new(reclaimer),
            metrics,
            default_model: Arc::from(config.embedding.default_model.as_str()),
        }
    }

    /// Replace the reclaimer, keeping metrics attached
    pub fn with_reclaimer(mut self, reclaimer: ResourceReclaimer) -> Self {
        self.reclaimer = Arc::new(reclaimer.with_metrics(self.metrics.clone()));
        self
    }
}

/// Embed transcript chunks.
///
/// Runs on a blocking thread: authenticate, validate, create a delegate,
/// embed. The reclaimer runs exactly once on the way out, whatever happened.
pub async fn embed(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("embed", %request_id);
    let started = Instant::now();
    let metrics = state.metrics.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        process_embed(&state, &headers, &body)
    })
    .await
    .unwrap_or_else(|e| Err(EmbedderError::Internal(join_error_message(e))));

    metrics.record_request(started.elapsed());

    match outcome {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            match e.kind() {
                ErrorKind::Internal => error!(%request_id, "Embedding request processing error: {}", e),
                _ => warn!(%request_id, "Embedding request rejected: {}", e),
            }
            metrics.record_error(e.kind());
            e.into_response()
        }
    }
}

/// The synchronous `/embed` pipeline
pub fn process_embed(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<EmbedResult> {
    let mut guard = ReclaimGuard::new(&state.reclaimer);

    state.auth.authorize_headers(headers)?;
    let request = InputValidator::parse_embed_request(body, &state.default_model)?;

    info!("Sending transcript to embedder");
    debug!(model = %request.model, chunks = request.chunks.len(), "Embed request accepted");

    let delegate = guard.hold(state.factory.create(&request.model)?);

    let started = Instant::now();
    let result = delegate.embed_transcript(&request.chunks)?;
    state.metrics.record_embedding(request.chunks.len(), started.elapsed());

    debug!("Embedding completed");
    Ok(result)
}

fn join_error_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "embedding task panicked".to_string())
}

/// Liveness check, no side effects
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse::healthy()))
}

/// Service banner
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "transcript-embedder",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// Prometheus metrics
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.export_prometheus()
}
