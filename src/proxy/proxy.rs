// ────────────────────────────────
// src/proxy/proxy.rs
// Entry handler: pick a backend, forward, hand the reply back untouched.
// ────────────────────────────────

use super::forwarder::{ForwardError, ForwardRequest, ForwardResult, Forwarder};
use crate::load_balancer::LoadBalancer;
use crate::metrics::{MetricsCollector, Timer};
use crate::retry::{RetryDecision, RetryPolicy};
use hyper::{Body, Request, Response, StatusCode};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct Proxy {
    balancer: Arc<dyn LoadBalancer>,
    forwarder: Arc<dyn Forwarder>,
    retry: RetryPolicy,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Proxy {
    pub fn new(
        balancer: Arc<dyn LoadBalancer>,
        forwarder: Arc<dyn Forwarder>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            balancer,
            forwarder,
            retry,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Serve one inbound request. Always produces a response.
    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        match ForwardRequest::from_hyper(req).await {
            Ok(request) => match self.dispatch(request).await {
                Ok(result) => result.into(),
                Err(err) => err.into(),
            },
            Err(err) => {
                warn!(%err, "failed to read inbound request");
                ProxyError::from(err).into()
            }
        }
    }

    /// Forward a buffered request to the next backend(s) chosen by the strategy.
    pub async fn dispatch(&self, request: ForwardRequest) -> Result<ForwardResult, ProxyError> {
        let timer = Timer::new();
        let request_id = Uuid::new_v4();
        let mut attempt = 0;

        let (backend, outcome) = loop {
            attempt += 1;

            // The strategy lock is released before the forward starts.
            let backend = self.balancer.select_next().await;
            debug!(
                %request_id,
                backend = %backend,
                method = %request.method,
                path = %request.path_and_query,
                attempt,
                "forwarding request"
            );

            let outcome = self.forwarder.forward(&backend, &request, request_id).await;
            if let Some(metrics) = &self.metrics {
                metrics.record_backend_request(backend.id(), outcome.is_ok());
            }

            let decision = match &outcome {
                Ok(result) => {
                    debug!(%request_id, backend = %backend, status = %result.status, "backend responded");
                    self.retry.decide_status(result.status, attempt)
                }
                Err(err) => {
                    warn!(%request_id, backend = %backend, %err, "forward failed");
                    RetryDecision::NoRetry
                }
            };

            match decision {
                RetryDecision::Retry => {
                    debug!(%request_id, attempt, "retrying on another backend");
                }
                RetryDecision::NoRetry => break (backend, outcome),
            }
        };

        let outcome = outcome.map_err(ProxyError::from);
        if let Some(metrics) = &self.metrics {
            let status = match &outcome {
                Ok(result) => result.status,
                Err(err) => err.status_code(),
            };
            metrics.record_request(
                request.method.as_str(),
                status.as_u16(),
                backend.id(),
                timer.elapsed(),
            );
        }
        outcome
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Invalid inbound request: {0}")]
    InvalidRequest(#[from] hyper::Error),

    #[error("Backend error: {0}")]
    Backend(#[from] ForwardError),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Backend(err) if err.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Backend(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

// Convert ProxyError to Hyper Response for error handling
impl From<ProxyError> for Response<Body> {
    fn from(err: ProxyError) -> Self {
        let status = err.status_code();
        let message = match status {
            StatusCode::BAD_REQUEST => "Bad request",
            StatusCode::GATEWAY_TIMEOUT => "Gateway timeout",
            _ => "Bad gateway",
        };

        let mut response = Response::new(Body::from(message));
        *response.status_mut() = status;
        response
    }
}
