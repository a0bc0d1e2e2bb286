// src/load_balancer/mod.rs
mod algorithm;
mod random;
mod registry;
mod round_robin;

pub use algorithm::LoadBalancer; // trait
pub use random::RandomBalancer;
pub use registry::{StrategyFactory, StrategyRegistry};
pub use round_robin::RoundRobinBalancer;

