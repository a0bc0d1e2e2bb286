// src/main.rs
use anyhow::{Context, Result};
use http_load_balancer::{
    config::{self, Config},
    load_balancer::StrategyRegistry,
    metrics::MetricsRegistry,
    proxy::{HttpForwarder, Proxy, ServerPool},
    retry::RetryPolicy,
    server::{RequestHandler, ServerBuilder},
};
use hyper::{Body, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("http_load_balancer=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path)
        .with_context(|| format!("Invalid configuration in {}", config_path))?;

    let proxy = build_proxy(&config)?;

    let handler = RequestHandler::new(Arc::new(proxy));

    info!("Starting load balancer on {}", config.listen);
    ServerBuilder::new(config.listen)
        .with_handler(handler)
        .serve_with_shutdown(shutdown_signal())
        .await?;

    info!("Load balancer stopped");
    Ok(())
}

/// Everything that can fail on bad configuration happens here, before the
/// listener is bound.
fn build_proxy(config: &Config) -> Result<Proxy> {
    let pool = ServerPool::from_config(&config.backends)?;
    let registry = StrategyRegistry::with_defaults();
    let balancer = registry
        .create(&config.strategy, &pool)
        .with_context(|| format!("Available strategies: {}", registry.names().join(", ")))?;
    let forwarder = Arc::new(HttpForwarder::new(&config.timeouts));
    let retry = RetryPolicy::from_config(&config.retry);

    if retry.is_enabled() {
        info!(max_attempts = retry.max_attempts(), "Retry on 5xx enabled");
    }

    let mut proxy = Proxy::new(balancer, forwarder, retry);

    if config.metrics.enabled {
        let metrics_registry = MetricsRegistry::new()?;
        let metrics = metrics_registry.collector();
        metrics.set_total_backends(pool.len());
        proxy = proxy.with_metrics(metrics);

        let metrics_addr: SocketAddr = ([0, 0, 0, 0], config.metrics.port).into();
        start_metrics_server(metrics_addr, metrics_registry, config.metrics.path.clone());
    }

    Ok(proxy)
}

fn start_metrics_server(addr: SocketAddr, registry: MetricsRegistry, path: String) {
    let registry = Arc::new(registry);
    let metrics_path = Arc::new(path); // keep this for logging
    let service_path = metrics_path.clone(); // clone for the service closure

    let make_service = hyper::service::make_service_fn(move |_| {
        let registry = registry.clone();
        let path = service_path.clone();

        async move {
            Ok::<_, Infallible>(hyper::service::service_fn(move |req: Request<Body>| {
                let registry = registry.clone();
                let path = path.clone();

                async move {
                    let (status, body) = if req.uri().path() != path.as_str() {
                        (StatusCode::NOT_FOUND, Body::from("Not Found"))
                    } else {
                        match registry.gather() {
                            Ok(metrics) => (StatusCode::OK, Body::from(metrics)),
                            Err(e) => {
                                warn!("Failed to encode metrics: {}", e);
                                (StatusCode::INTERNAL_SERVER_ERROR, Body::empty())
                            }
                        }
                    };

                    let mut response = Response::new(body);
                    *response.status_mut() = status;
                    if status == StatusCode::OK {
                        response.headers_mut().insert(
                            hyper::header::CONTENT_TYPE,
                            hyper::header::HeaderValue::from_static("text/plain; version=0.0.4"),
                        );
                    }
                    Ok::<_, Infallible>(response)
                }
            }))
        }
    });

    info!(
        "Metrics server listening on http://{}{}",
        addr,
        metrics_path.as_str()
    );

    tokio::spawn(async move {
        match Server::try_bind(&addr) {
            Ok(builder) => {
                if let Err(e) = builder.serve(make_service).await {
                    error!("Metrics server error: {}", e);
                }
            }
            Err(e) => error!("Metrics server failed to bind {}: {}", addr, e),
        }
    });
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
