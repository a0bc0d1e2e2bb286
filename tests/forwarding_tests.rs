// tests/forwarding_tests.rs
use http_load_balancer::config::TimeoutConfig;
use http_load_balancer::proxy::{
    Backend, ForwardError, ForwardRequest, Forwarder, HttpForwarder, REQUEST_ID_HEADER,
};
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderValue, LOCATION};
use hyper::{Method, StatusCode};
use mockito::{Matcher, ServerGuard};
use std::net::SocketAddr;
use uuid::Uuid;

const UUID_PATTERN: &str = "^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$";

fn backend_for(server: &ServerGuard) -> Backend {
    let addr: SocketAddr = server.host_with_port().parse().unwrap();
    Backend::new(addr.ip().to_string(), addr.port()).unwrap()
}

fn forwarder() -> HttpForwarder {
    HttpForwarder::new(&TimeoutConfig::default())
}

fn request(method: Method, path_and_query: &str, headers: HeaderMap, body: Bytes) -> ForwardRequest {
    ForwardRequest {
        method,
        path_and_query: path_and_query.to_string(),
        headers,
        body,
    }
}

#[tokio::test]
async fn test_headers_body_and_cookies_pass_through() {
    let mut server = mockito::Server::new_async().await;
    let payload = serde_json::json!({ "item": "widget", "qty": 3 }).to_string();
    let id = Uuid::new_v4();

    let mock = server
        .mock("POST", "/orders")
        .match_header("x-client", "mobile")
        .match_header("cookie", "session=abc123; theme=dark")
        .match_header("content-type", "application/json")
        .match_header(REQUEST_ID_HEADER, id.hyphenated().to_string().as_str())
        .match_body(Matcher::Exact(payload.clone()))
        .with_status(201)
        .with_header("x-backend", "orders-1")
        .with_body("created")
        .create_async()
        .await;

    let mut headers = HeaderMap::new();
    headers.insert("x-client", HeaderValue::from_static("mobile"));
    headers.insert("cookie", HeaderValue::from_static("session=abc123; theme=dark"));
    headers.insert("content-type", HeaderValue::from_static("application/json"));

    let result = forwarder()
        .forward(
            &backend_for(&server),
            &request(Method::POST, "/orders", headers, Bytes::from(payload)),
            id,
        )
        .await
        .unwrap();

    assert_eq!(result.status, StatusCode::CREATED);
    assert_eq!(result.headers.get("x-backend").unwrap(), "orders-1");
    assert_eq!(&result.body[..], b"created");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_no_client_headers_added() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/plain")
        .match_header("user-agent", Matcher::Missing)
        .match_header("accept", Matcher::Missing)
        .match_header("accept-encoding", Matcher::Missing)
        .match_header(REQUEST_ID_HEADER, Matcher::Regex(UUID_PATTERN.to_string()))
        .with_body("bare")
        .create_async()
        .await;

    let result = forwarder()
        .forward(
            &backend_for(&server),
            &request(Method::GET, "/plain", HeaderMap::new(), Bytes::new()),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    assert_eq!(result.status, StatusCode::OK);
    assert_eq!(&result.body[..], b"bare");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_query_string_forwarded_unchanged() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "rust lang".into()),
            Matcher::UrlEncoded("page".into(), "2".into()),
        ]))
        .match_header(REQUEST_ID_HEADER, Matcher::Regex(UUID_PATTERN.to_string()))
        .with_body("results")
        .create_async()
        .await;

    let result = forwarder()
        .forward(
            &backend_for(&server),
            &request(Method::GET, "/search?q=rust%20lang&page=2", HeaderMap::new(), Bytes::new()),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    assert_eq!(result.status, StatusCode::OK);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_method_forwarded_unchanged() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("DELETE", "/items/42")
        .with_status(204)
        .create_async()
        .await;

    let result = forwarder()
        .forward(
            &backend_for(&server),
            &request(Method::DELETE, "/items/42", HeaderMap::new(), Bytes::new()),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    assert_eq!(result.status, StatusCode::NO_CONTENT);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_redirect_is_not_followed() {
    let mut server = mockito::Server::new_async().await;
    let redirect = server
        .mock("GET", "/old")
        .with_status(302)
        .with_header("location", "/new")
        .create_async()
        .await;
    let target = server
        .mock("GET", "/new")
        .expect(0)
        .create_async()
        .await;

    let result = forwarder()
        .forward(
            &backend_for(&server),
            &request(Method::GET, "/old", HeaderMap::new(), Bytes::new()),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    assert_eq!(result.status, StatusCode::FOUND);
    assert_eq!(result.headers.get(LOCATION).unwrap(), "/new");
    redirect.assert_async().await;
    target.assert_async().await;
}

#[tokio::test]
async fn test_backend_errors_are_results_not_failures() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .with_status(503)
        .with_header("set-cookie", "a=1")
        .with_header("set-cookie", "b=2")
        .with_body("down for maintenance")
        .create_async()
        .await;

    let result = forwarder()
        .forward(
            &backend_for(&server),
            &request(Method::GET, "/", HeaderMap::new(), Bytes::new()),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    assert_eq!(result.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(result.headers.get_all("set-cookie").iter().count(), 2);
    assert_eq!(&result.body[..], b"down for maintenance");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_connection_refused_is_an_error() {
    // Grab a free port and release it so nothing is listening there.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let backend = Backend::new("127.0.0.1", port).unwrap();

    let err = forwarder()
        .forward(
            &backend,
            &request(Method::GET, "/", HeaderMap::new(), Bytes::new()),
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ForwardError::Connect { .. }), "got {:?}", err);
}
