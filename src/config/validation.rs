//! Configuration validation

use super::*;
use crate::error::{EmbedderError, Result};

/// Log formats understood by `observability::init_observability`
pub const LOG_FORMATS: &[&str] = &["json", "compact", "pretty"];

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server_config(&config.server)?;
    validate_embedding_config(&config.embedding)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validate server configuration
pub fn validate_server_config(config: &ServerConfig) -> Result<()> {
    // Validate port range
    if config.port == 0 {
        return Err(EmbedderError::Config(
            "Server port cannot be 0".to_string()
        ));
    }

    // Validate host
    if config.host.is_empty() {
        return Err(EmbedderError::Config(
            "Server host cannot be empty".to_string()
        ));
    }

    if config.max_body_size_mb == 0 {
        return Err(EmbedderError::Config(
            "Max body size must be greater than 0".to_string()
        ));
    }

    if config.max_body_size_mb > 100 {
        return Err(EmbedderError::Config(
            "Max body size too large (max: 100 MB)".to_string()
        ));
    }

    Ok(())
}

/// Validate embedding configuration
fn validate_embedding_config(config: &EmbeddingConfig) -> Result<()> {
    if config.default_model.trim().is_empty() {
        return Err(EmbedderError::Config(
            "Default embedding model cannot be empty".to_string()
        ));
    }

    if config.batch_size == Some(0) {
        return Err(EmbedderError::Config(
            "Embedding batch size must be greater than 0".to_string()
        ));
    }

    Ok(())
}

fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    if !LOG_FORMATS.contains(&config.format.as_str()) {
        return Err(EmbedderError::Config(
            format!("Unknown log format '{}' (expected one of {:?})", config.format, LOG_FORMATS)
        ));
    }

    Ok(())
}
