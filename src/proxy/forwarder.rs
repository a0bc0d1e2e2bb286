// ────────────────────────────────
// src/proxy/forwarder.rs
// Relays one buffered inbound request to a backend and buffers the reply.
// ────────────────────────────────

use super::backend::Backend;
use crate::config::TimeoutConfig;
use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::client::HttpConnector;
use hyper::header::{HeaderMap, HeaderName, CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use hyper::{Body, Client, Method, Request, Response, StatusCode};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Correlation header attached to every outbound call.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Connection-level headers the HTTP client regenerates for the outbound hop.
const CONNECTION_HEADERS: [HeaderName; 4] = [HOST, CONTENT_LENGTH, TRANSFER_ENCODING, CONNECTION];

/// Inbound request with its body fully read.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ForwardRequest {
    pub async fn from_hyper(req: Request<Body>) -> Result<Self, hyper::Error> {
        let (parts, body) = req.into_parts();
        let body = hyper::body::to_bytes(body).await?;
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        Ok(Self {
            method: parts.method,
            path_and_query,
            headers: parts.headers,
            body,
        })
    }
}

/// Backend reply, copied verbatim.
#[derive(Debug, Clone)]
pub struct ForwardResult {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl From<ForwardResult> for Response<Body> {
    fn from(result: ForwardResult) -> Self {
        let mut response = Response::new(Body::from(result.body));
        *response.status_mut() = result.status;
        *response.headers_mut() = result.headers;
        response
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to build outbound request: {0}")]
    InvalidRequest(#[from] hyper::http::Error),

    #[error("Backend {backend} timed out")]
    Timeout { backend: String },

    #[error("Connection to backend {backend} failed: {source}")]
    Connect {
        backend: String,
        #[source]
        source: hyper::Error,
    },

    #[error("Backend {backend} protocol error: {source}")]
    Protocol {
        backend: String,
        #[source]
        source: hyper::Error,
    },
}

impl ForwardError {
    fn from_hyper(backend: &Backend, err: hyper::Error) -> Self {
        let backend = backend.id().to_string();
        if err.is_connect() && timed_out(&err) {
            ForwardError::Timeout { backend }
        } else if err.is_connect() {
            ForwardError::Connect {
                backend,
                source: err,
            }
        } else {
            ForwardError::Protocol {
                backend,
                source: err,
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ForwardError::Timeout { .. })
    }
}

// The connector reports an elapsed connect deadline as an io TimedOut error.
fn timed_out(err: &hyper::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(
        &self,
        backend: &Backend,
        request: &ForwardRequest,
        correlation_id: Uuid,
    ) -> Result<ForwardResult, ForwardError>;
}

/// Forwarder over a shared hyper client. Never follows redirects and adds no
/// headers of its own beyond `Host`, framing and `X-Request-ID`.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
    request_timeout: Duration,
}

impl HttpForwarder {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeouts.connect()));

        Self {
            client: Client::builder().build(connector),
            request_timeout: timeouts.request(),
        }
    }

    fn outbound_request(
        url: &Url,
        request: &ForwardRequest,
        correlation_id: Uuid,
    ) -> Result<Request<Body>, ForwardError> {
        let mut builder = Request::builder()
            .method(request.method.clone())
            .uri(url.as_str());

        if let Some(headers) = builder.headers_mut() {
            *headers = request.headers.clone();
            for name in &CONNECTION_HEADERS {
                headers.remove(name);
            }
            headers.remove(REQUEST_ID_HEADER);
        }

        let outbound = builder
            .header(REQUEST_ID_HEADER, correlation_id.hyphenated().to_string())
            .body(Body::from(request.body.clone()))?;
        Ok(outbound)
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(
        &self,
        backend: &Backend,
        request: &ForwardRequest,
        correlation_id: Uuid,
    ) -> Result<ForwardResult, ForwardError> {
        let url = backend.url_for(&request.path_and_query)?;
        let outbound = Self::outbound_request(&url, request, correlation_id)?;

        let exchange = async {
            let response = self.client.request(outbound).await?;
            let (parts, body) = response.into_parts();
            let body = hyper::body::to_bytes(body).await?;
            Ok::<_, hyper::Error>((parts, body))
        };

        let (parts, body) = tokio::time::timeout(self.request_timeout, exchange)
            .await
            .map_err(|_| ForwardError::Timeout {
                backend: backend.id().to_string(),
            })?
            .map_err(|e| ForwardError::from_hyper(backend, e))?;

        Ok(ForwardResult {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::{HeaderValue, COOKIE};

    fn request_with(headers: &[(&'static str, &'static str)]) -> ForwardRequest {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(*name, HeaderValue::from_static(*value));
        }
        ForwardRequest {
            method: Method::POST,
            path_and_query: "/submit?draft=1".to_string(),
            headers: map,
            body: Bytes::from_static(b"payload"),
        }
    }

    fn url() -> Url {
        Backend::new("h1", 8001)
            .unwrap()
            .url_for("/submit?draft=1")
            .unwrap()
    }

    #[tokio::test]
    async fn test_outbound_request_keeps_inbound_headers() {
        let request = request_with(&[
            ("x-tag", "a"),
            ("x-tag", "b"),
            ("cookie", "session=abc"),
            ("host", "lb.local"),
            ("content-length", "7"),
        ]);
        let id = Uuid::new_v4();

        let outbound = HttpForwarder::outbound_request(&url(), &request, id).unwrap();
        let headers = outbound.headers();

        assert_eq!(outbound.method(), Method::POST);
        assert_eq!(outbound.uri(), "http://h1:8001/submit?draft=1");
        let tags: Vec<_> = headers.get_all("x-tag").iter().collect();
        assert_eq!(tags, vec!["a", "b"]);
        assert_eq!(headers.get(COOKIE).unwrap(), "session=abc");
        assert!(headers.get(HOST).is_none());
        assert!(headers.get(CONTENT_LENGTH).is_none());
        assert_eq!(
            headers.get(REQUEST_ID_HEADER).unwrap().to_str().unwrap(),
            id.hyphenated().to_string()
        );
        // Nothing beyond the inbound headers and the correlation id.
        assert_eq!(headers.len(), 4);

        let body = hyper::body::to_bytes(outbound.into_body()).await.unwrap();
        assert_eq!(&body[..], b"payload");
    }

    #[test]
    fn test_outbound_request_overwrites_request_id() {
        let request = request_with(&[("x-request-id", "spoofed"), ("x-request-id", "twice")]);
        let id = Uuid::new_v4();

        let outbound = HttpForwarder::outbound_request(&url(), &request, id).unwrap();

        let ids: Vec<_> = outbound.headers().get_all(REQUEST_ID_HEADER).iter().collect();
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].to_str().unwrap(), id.to_string());
    }

    #[tokio::test]
    async fn test_from_hyper_buffers_body_and_query() {
        let req = Request::builder()
            .method(Method::PUT)
            .uri("/items/7?verbose=true")
            .header("x-custom", "1")
            .body(Body::from("raw bytes"))
            .unwrap();

        let request = ForwardRequest::from_hyper(req).await.unwrap();

        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.path_and_query, "/items/7?verbose=true");
        assert_eq!(request.headers.get("x-custom").unwrap(), "1");
        assert_eq!(&request.body[..], b"raw bytes");
    }

    #[tokio::test]
    async fn test_result_converts_verbatim() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        let result = ForwardResult {
            status: StatusCode::IM_A_TEAPOT,
            headers,
            body: Bytes::from_static(b"short and stout"),
        };

        let response: Response<Body> = result.into();

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(response.headers().get_all("set-cookie").iter().count(), 2);
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], b"short and stout");
    }
}
