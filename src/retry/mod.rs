// src/retry/mod.rs
mod policy;

pub use policy::{RetryDecision, RetryPolicy, MAX_ATTEMPTS};
