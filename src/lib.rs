//! Transcript Embedder - HTTP service that embeds transcript chunks
//!
//! `POST /embed` takes `{"chunks": [...], "model": "..."}`, checks the bearer
//! token, hands the chunks to a freshly created embedding delegate and
//! returns the delegate's JSON unchanged. After every call the delegate is
//! torn down and process memory is reclaimed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use transcript_embedder::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml")?;
//!     let factory = Arc::new(FastEmbedFactory::new(config.embedding.clone()));
//!     let app = build_router(AppState::new(&config, factory), &config.server);
//!     transcript_embedder::server::start_server(&config.bind_address(), app).await
//! }
//! ```

pub mod api;
pub mod config;
pub mod embedding;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod reclaim;
pub mod server;

pub use config::Config;
pub use error::{EmbedderError, EmbeddingError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{build_router, AppState};
    pub use crate::config::Config;
    pub use crate::embedding::{DelegateFactory, EmbeddingDelegate, FastEmbedFactory, MockDelegateFactory};
    pub use crate::error::{EmbedderError, EmbeddingError, Result};
    pub use crate::middleware::{BearerAuth, InputValidator};
    pub use crate::observability::MetricsCollector;
    pub use crate::reclaim::{ReclaimStep, ResourceReclaimer};
}
