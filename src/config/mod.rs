// src/config/mod.rs
mod models;

pub use models::*;

use std::path::Path;

/// Prefix for environment overrides, e.g. `LB__STRATEGY=random` or
/// `LB__RETRY__ENABLED=true`.
pub const ENV_PREFIX: &str = "LB";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Server pool must contain at least one backend")]
    EmptyPool,

    #[error("Invalid backend {host}:{port}: {reason}")]
    InvalidBackend {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("Duplicate backend {0}")]
    DuplicateBackend(String),

    #[error("Unknown load balancing strategy: {0}")]
    UnknownStrategy(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Load configuration from a file (YAML or JSON, picked by extension),
/// then layer `LB__*` environment variables on top.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let config: Config = ::config::Config::builder()
        .add_source(::config::File::from(path.as_ref()))
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    config.validate()?;
    Ok(config)
}
