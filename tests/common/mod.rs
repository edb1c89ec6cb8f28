//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use gym_gateway::http::AppState;
use gym_gateway::{GatewayConfig, GatewayServer, Shutdown};

/// One request as the mock upstream saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub uri: String,
    pub content_type: Option<String>,
    pub authorization: Option<String>,
    pub body: String,
}

/// Requests received by a mock upstream, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Recorded>>>);

impl Recorder {
    pub fn all(&self) -> Vec<Recorded> {
        self.0.lock().unwrap().clone()
    }

    pub fn last(&self) -> Recorded {
        self.all().pop().expect("upstream saw no request")
    }

    pub fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// Serve `router` on an ephemeral local port.
pub async fn start_upstream(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// An address nothing listens on.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn header_text(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

async fn echo(
    State(recorder): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let text = String::from_utf8_lossy(&body).into_owned();
    recorder.0.lock().unwrap().push(Recorded {
        method: method.clone(),
        uri: uri.to_string(),
        content_type: header_text(&headers, header::CONTENT_TYPE),
        authorization: header_text(&headers, header::AUTHORIZATION),
        body: text.clone(),
    });

    let parsed: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
    (
        [("x-upstream-only", "yes")],
        Json(json!({
            "method": method.as_str(),
            "path": uri.path(),
            "query": uri.query(),
            "body": parsed,
        })),
    )
        .into_response()
}

/// Mock upstream: a few fixed paths, everything else echoes the request back
/// as JSON and records it.
pub fn echo_upstream(recorder: Recorder) -> Router {
    Router::new()
        .route(
            "/text",
            any(|| async { ([(header::CONTENT_TYPE, "text/plain")], "plain words") }),
        )
        .route(
            "/missing",
            any(|| async { (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found"}))) }),
        )
        .route(
            "/created",
            any(|| async { (StatusCode::CREATED, Json(json!({"member_id": 51}))) }),
        )
        .route(
            "/bad-json",
            any(|| async { ([(header::CONTENT_TYPE, "application/json")], "{not json") }),
        )
        .route(
            "/no-content-type",
            any(|| async { Response::new(axum::body::Body::from("raw bytes")) }),
        )
        .fallback(echo)
        .with_state(recorder)
}

/// Default gateway configuration pointed at `upstream`.
pub fn gateway_config(upstream: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.origin = format!("http://{}", upstream);
    config
}

pub struct TestGateway {
    pub addr: SocketAddr,
    pub state: AppState,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Run a gateway with `config` on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = GatewayServer::new(config).unwrap();
    let state = server.state();
    let shutdown = Shutdown::new();
    let (_, updates) = mpsc::unbounded_channel();
    let stop = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, updates, stop).await.unwrap();
    });

    TestGateway {
        addr,
        state,
        shutdown,
    }
}

/// HTTP client that ignores proxy settings from the environment.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
