// src/load_balancer/algorithm.rs
use crate::config::ConfigError;
use crate::proxy::{Backend, ServerPool};
use async_trait::async_trait;

/// A routing strategy over a fixed server pool.
///
/// Implementations own whatever selection state they need; callers only see
/// `select_next`, so strategies are interchangeable behind `Arc<dyn LoadBalancer>`.
#[async_trait]
pub trait LoadBalancer: Send + Sync {
    /// Build the strategy from the pool. Fails on an empty pool.
    fn from_pool(pool: &ServerPool) -> Result<Self, ConfigError>
    where
        Self: Sized;

    /// Pick the backend for the next request. Must not block beyond a short
    /// critical section.
    async fn select_next(&self) -> Backend;

    fn name(&self) -> &'static str;
}
