// src/retry/policy.rs

use crate::config::RetryConfig;
use hyper::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    NoRetry,
}

/// Upper bound on attempts per inbound request: the first try plus one retry.
pub const MAX_ATTEMPTS: u32 = 2;

/// Bounded retry against another backend on a 5xx reply. Off unless
/// configured. Network failures are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// One attempt per inbound request.
    pub fn disabled() -> Self {
        Self { max_attempts: 1 }
    }

    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        if config.enabled {
            Self::new(config.max_attempts)
        } else {
            Self::disabled()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 1
    }

    /// Decide after `attempt` (1-based) came back with `status`.
    pub fn decide_status(&self, status: StatusCode, attempt: u32) -> RetryDecision {
        if attempt < self.max_attempts && Self::is_retryable_status(status) {
            RetryDecision::Retry
        } else {
            RetryDecision::NoRetry
        }
    }

    pub fn is_retryable_status(status: StatusCode) -> bool {
        status.is_server_error()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}
