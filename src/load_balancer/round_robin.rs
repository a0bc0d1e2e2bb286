// src/load_balancer/round_robin.rs
use crate::config::ConfigError;
use crate::load_balancer::LoadBalancer;
use crate::proxy::{Backend, ServerPool};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

pub struct RoundRobinBalancer {
    // Always a rotation of the pool order.
    rotation: Mutex<VecDeque<Backend>>,
}

#[async_trait]
impl LoadBalancer for RoundRobinBalancer {
    fn from_pool(pool: &ServerPool) -> Result<Self, ConfigError> {
        if pool.is_empty() {
            return Err(ConfigError::EmptyPool);
        }

        Ok(Self {
            rotation: Mutex::new(pool.iter().cloned().collect()),
        })
    }

    async fn select_next(&self) -> Backend {
        let mut rotation = self.rotation.lock().await;
        // Never empty: from_pool rejects empty pools and rotation keeps the length.
        let head = rotation[0].clone();
        rotation.rotate_left(1);
        head
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}
