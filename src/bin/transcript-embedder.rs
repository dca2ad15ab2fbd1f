//! Transcript Embedder Server Binary
//!
//! Loads configuration, initialises logging and serves `/embed` and `/health`
//! until Ctrl+C or SIGTERM.

use std::sync::Arc;
use tracing::{info, warn};
use transcript_embedder::{
    api::{build_router, AppState},
    config::Config,
    embedding::FastEmbedFactory,
    observability::init_observability,
    server::start_server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (also reads .env)
    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let config = Config::load(&config_path)?;

    init_observability(&config.logging.level, &config.logging.format);

    info!("Starting Transcript Embedder");
    info!("Configuration loaded and validated from {}", config_path);
    info!(
        "HF_TOKEN {}",
        if std::env::var("HF_TOKEN").is_ok() { "is set" } else { "is not set" }
    );

    if !config.auth.is_enforced() {
        warn!("API_TOKEN is not set: /embed accepts unauthenticated requests");
    }

    let factory = Arc::new(FastEmbedFactory::new(config.embedding.clone()));
    let app_state = AppState::new(&config, factory);
    info!(steps = ?app_state.reclaimer.step_names(), "Resource reclaimer initialized");

    let app = build_router(app_state, &config.server);

    start_server(&config.bind_address(), app).await
}
