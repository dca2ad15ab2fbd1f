//! API route configuration

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::config::ServerConfig;

use super::handlers::{self, AppState};

/// Build the complete API router with middleware
pub fn build_router(app_state: AppState, server: &ServerConfig) -> Router {
    let body_limit_bytes = server.max_body_size_mb * 1024 * 1024;

    // Public routes (no auth)
    let public_routes = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .with_state(app_state.clone());

    // Token checking happens inside the handler so the reclaimer covers 401s too
    let api_routes = Router::new()
        .route("/embed", post(handlers::embed))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .with_state(app_state);

    public_routes
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
}
