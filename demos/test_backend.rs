//! demos/test_backend.rs
//! Run: cargo run --example test_backend -- <port> [server-id]

use hyper::{
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server, StatusCode,
};
use rand::Rng;
use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tracing::info;

#[derive(Clone)]
struct BackendState {
    server_id:   String,
    req_counter: Arc<AtomicU64>,
    fail_pct:    f64,
}

async fn handle(
    req: Request<Body>,
    state: BackendState,
) -> Result<Response<Body>, Infallible> {
    let n = state.req_counter.fetch_add(1, Ordering::SeqCst) + 1;
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_owned();

    info!(
        server = %state.server_id,
        method = %req.method(),
        uri = %req.uri(),
        %request_id,
        count = n,
        "received a request"
    );

    // Simulate failure so retry behaviour can be observed
    if state.fail_pct > 0.0
        && rand::thread_rng().gen_bool((state.fail_pct / 100.0).min(1.0))
    {
        let mut response = Response::new(Body::from("Injected failure\n"));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        return Ok(response);
    }

    Ok(Response::new(Body::from(format!(
        "Hello from server #{}\n",
        state.server_id
    ))))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_backend=info".parse()?),
        )
        .init();

    // ── Parse args / env ─────────────────────────────────────────────
    let port: u16 = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "8001".into())
        .parse()?;
    let server_id = std::env::args()
        .nth(2)
        .or_else(|| std::env::var("SERVER_ID").ok())
        .unwrap_or_else(|| "1".into());
    let fail_pct =
        std::env::var("FAIL_PCT").ok().and_then(|v| v.parse().ok()).unwrap_or(0.0);

    let state = BackendState {
        server_id: server_id.clone(),
        req_counter: Arc::new(AtomicU64::new(0)),
        fail_pct,
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let make_svc = make_service_fn(move |_conn| {
        let st = state.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                handle(req, st.clone())
            }))
        }
    });

    info!("Backend server #{} on http://{} [fail={} %]", server_id, addr, fail_pct);

    Server::bind(&addr).serve(make_svc).await?;
    Ok(())
}
