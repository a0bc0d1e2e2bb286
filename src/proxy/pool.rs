//
// src/proxy/pool.rs
//

use super::backend::Backend;
use crate::config::{BackendConfig, ConfigError};
use std::collections::HashSet;

/// Ordered, non-empty set of backends fixed at startup.
#[derive(Debug, Clone)]
pub struct ServerPool {
    backends: Vec<Backend>,
}

impl ServerPool {
    pub fn new(backends: Vec<Backend>) -> Result<Self, ConfigError> {
        if backends.is_empty() {
            return Err(ConfigError::EmptyPool);
        }

        let mut seen = HashSet::with_capacity(backends.len());
        for backend in &backends {
            if !seen.insert(backend) {
                return Err(ConfigError::DuplicateBackend(backend.id().to_string()));
            }
        }

        Ok(Self { backends })
    }

    pub fn from_config(configs: &[BackendConfig]) -> Result<Self, ConfigError> {
        let backends = configs
            .iter()
            .map(|config| Backend::new(config.host.clone(), config.port))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(backends)
    }

    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    pub fn iter(&self) -> impl Iterator<Item = &Backend> + Clone {
        self.backends.iter()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
