//! Configuration loader with environment variable support

use super::Config;
use crate::error::Result;
use config::{Environment, File, FileFormat};
use std::path::Path;
use tracing::debug;

/// Prefix for structured environment overrides, e.g. `EMBEDDER__SERVER__PORT`
pub const ENV_PREFIX: &str = "EMBEDDER";

/// Load configuration from defaults, an optional TOML file and the environment.
///
/// `.env` is read first so its values are visible to every later source.
/// The flat `API_TOKEN`, `HOST` and `PORT` variables take precedence over
/// everything else.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(env_path) => debug!("Loaded environment from {}", env_path.display()),
        Err(e) => debug!("No .env file loaded: {}", e),
    }

    let config = config::Config::builder()
        .add_source(File::from(path.as_ref()).format(FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
        )
        .set_override_option("auth.api_token", std::env::var("API_TOKEN").ok())?
        .set_override_option("server.host", std::env::var("HOST").ok())?
        .set_override_option("server.port", std::env::var("PORT").ok())?
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    Ok(cfg)
}
