//! Configuration management for the embedding service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use secrecy::{Secret, ExposeSecret};

pub mod loader;
pub mod validation;

/// Model used when a request does not name one
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub reclaim: ReclaimConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size")]
    pub max_body_size_mb: usize,
}

/// Bearer token authentication
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Expected API token. `None` leaves `/embed` open.
    #[serde(default, serialize_with = "serialize_optional_secret", deserialize_with = "deserialize_optional_secret")]
    pub api_token: Option<Secret<String>>,
}

/// Configuration for the embedding delegate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name used when the request omits `model`
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Directory where downloaded model files are cached
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Show download progress bars when fetching models
    #[serde(default)]
    pub show_download_progress: bool,

    /// Inference batch size (library default when unset)
    #[serde(default)]
    pub batch_size: Option<usize>,
}

/// Post-request memory reclamation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReclaimConfig {
    /// Return freed heap pages to the OS after each request
    #[serde(default = "default_true")]
    pub trim_heap: bool,

    /// Clear the accelerator memory pool when one is attached
    #[serde(default = "default_true")]
    pub clear_accelerator_cache: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_server_host() -> String { "0.0.0.0".to_string() }
fn default_server_port() -> u16 { 19000 }
fn default_max_body_size() -> usize { 10 } // 10 MB default
fn default_model() -> String { DEFAULT_MODEL.to_string() }
fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            max_body_size_mb: default_max_body_size(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            cache_dir: None,
            show_download_progress: false,
            batch_size: None,
        }
    }
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self {
            trim_heap: true,
            clear_accelerator_cache: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file, `.env` and the environment
    pub fn load<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let config = loader::load_config(path)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Validate this configuration
    pub fn validate(&self) -> crate::error::Result<()> {
        validation::validate_config(self)
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl AuthConfig {
    /// Build from a raw token, treating an empty string as unset
    pub fn with_token(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            api_token: (!token.is_empty()).then(|| Secret::new(token)),
        }
    }

    /// Whether `/embed` requires a bearer token
    pub fn is_enforced(&self) -> bool {
        self.api_token
            .as_ref()
            .is_some_and(|t| !t.expose_secret().is_empty())
    }
}

/// Custom serializer for Option<Secret<String>>
fn serialize_optional_secret<S>(secret: &Option<Secret<String>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

/// Custom deserializer for Option<Secret<String>>, mapping "" to `None`
fn deserialize_optional_secret<'de, D>(deserializer: D) -> Result<Option<Secret<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|s| !s.is_empty()).map(Secret::new))
}
