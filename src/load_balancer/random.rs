// src/load_balancer/random.rs
use crate::config::ConfigError;
use crate::load_balancer::LoadBalancer;
use crate::proxy::{Backend, ServerPool};
use async_trait::async_trait;
use rand::Rng;

/// Uniform random choice over the pool. Holds no mutable state.
pub struct RandomBalancer {
    backends: Vec<Backend>,
}

#[async_trait]
impl LoadBalancer for RandomBalancer {
    fn from_pool(pool: &ServerPool) -> Result<Self, ConfigError> {
        if pool.is_empty() {
            return Err(ConfigError::EmptyPool);
        }

        Ok(Self {
            backends: pool.backends().to_vec(),
        })
    }

    async fn select_next(&self) -> Backend {
        let index = rand::thread_rng().gen_range(0..self.backends.len());
        self.backends[index].clone()
    }

    fn name(&self) -> &'static str {
        "random"
    }
}
