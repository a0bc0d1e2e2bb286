// src/load_balancer/registry.rs
use crate::config::ConfigError;
use crate::load_balancer::{LoadBalancer, RandomBalancer, RoundRobinBalancer};
use crate::proxy::ServerPool;
use std::collections::HashMap;
use std::sync::Arc;

pub type StrategyFactory = fn(&ServerPool) -> Result<Arc<dyn LoadBalancer>, ConfigError>;

/// Strategy name → factory. Filled once at startup, queried once.
pub struct StrategyRegistry {
    factories: HashMap<String, StrategyFactory>,
}

fn build<L: LoadBalancer + 'static>(pool: &ServerPool) -> Result<Arc<dyn LoadBalancer>, ConfigError> {
    Ok(Arc::new(L::from_pool(pool)?))
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with every built-in strategy.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("round_robin", build::<RoundRobinBalancer>);
        registry.register("random", build::<RandomBalancer>);
        registry
    }

    /// Adds or replaces a strategy.
    pub fn register(&mut self, name: impl Into<String>, factory: StrategyFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn create(
        &self,
        name: &str,
        pool: &ServerPool,
    ) -> Result<Arc<dyn LoadBalancer>, ConfigError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ConfigError::UnknownStrategy(name.to_string()))?;

        let balancer = factory(pool)?;
        tracing::info!(
            strategy = balancer.name(),
            backends = pool.len(),
            "Load balancing strategy ready"
        );
        Ok(balancer)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
