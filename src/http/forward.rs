//! Request forwarding to the upstream origin.
//!
//! # Responsibilities
//! - Derive the upstream target URL from the path fragment and query string
//! - Decide whether the inbound body travels upstream
//! - Issue exactly one upstream call per inbound request
//! - Classify the upstream body as JSON or opaque text
//!
//! # Design Decisions
//! - Inbound headers are never forwarded; only `Content-Type: application/json`
//! - No retries, no per-call timeout: the host's request timeout applies
//! - Body classification keys off the upstream content-type only

use axum::body::Bytes;
use axum::http::{Method, StatusCode};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::error::Error as _;
use std::fmt;
use thiserror::Error;

/// Value of the `Allow` header on 405 responses.
pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, PATCH, OPTIONS";

/// Methods the gateway accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForwardMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl ForwardMethod {
    /// Map an HTTP method onto an accepted method, if it is one.
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(Self::Get),
            Method::POST => Some(Self::Post),
            Method::PUT => Some(Self::Put),
            Method::PATCH => Some(Self::Patch),
            Method::DELETE => Some(Self::Delete),
            Method::OPTIONS => Some(Self::Options),
            _ => None,
        }
    }

    pub fn as_method(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
            Self::Patch => Method::PATCH,
            Self::Delete => Method::DELETE,
            Self::Options => Method::OPTIONS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }

    /// Only POST, PUT and PATCH carry a body upstream.
    pub fn carries_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl fmt::Display for ForwardMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound request reduced to what the gateway forwards.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundRequest {
    pub method: ForwardMethod,
    /// Everything after the mount prefix, without the leading slash.
    pub path: String,
    pub query: Option<String>,
    pub body: Option<Value>,
}

/// Build the upstream URL: `origin/path`, plus `?query` when the query is
/// non-empty.
pub fn build_target_url(origin: &str, path: &str, query: Option<&str>) -> String {
    let mut url = format!("{}/{}", origin, path);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}

/// Strip the mount prefix (and one separating slash) from a request path.
pub fn path_fragment<'a>(path: &'a str, prefix: &str) -> &'a str {
    let rest = path.strip_prefix(prefix).unwrap_or(path);
    rest.strip_prefix('/').unwrap_or(rest)
}

/// Interpret an inbound body. Blank bodies are absent; bodies that are not
/// JSON are kept as a JSON string of their text.
pub fn parse_inbound_body(bytes: &[u8]) -> Option<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(String::from_utf8_lossy(bytes).into_owned())),
    }
}

/// The body sent upstream for `method`, if any.
pub fn outbound_body(method: ForwardMethod, body: Option<&Value>) -> Option<String> {
    if !method.carries_body() {
        return None;
    }
    body.map(Value::to_string)
}

/// Upstream response body, classified by declared content-type.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    Json(Value),
    Text(String),
}

impl UpstreamBody {
    pub fn is_json_content_type(content_type: Option<&str>) -> bool {
        content_type.is_some_and(|ct| ct.contains("application/json"))
    }

    /// Parse as JSON when the content-type says so, otherwise keep the raw
    /// text.
    pub fn decode(content_type: Option<&str>, bytes: &[u8]) -> Result<Self, serde_json::Error> {
        if Self::is_json_content_type(content_type) {
            serde_json::from_slice(bytes).map(Self::Json)
        } else {
            Ok(Self::Text(String::from_utf8_lossy(bytes).into_owned()))
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Json(value) => Bytes::from(value.to_string()),
            Self::Text(text) => Bytes::from(text),
        }
    }
}

/// What the upstream answered.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: UpstreamBody,
}

/// Errors on the single upstream attempt.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("{}", error_chain(.0))]
    Send(reqwest::Error),

    #[error("{}", error_chain(.0))]
    Read(reqwest::Error),

    #[error("invalid JSON from upstream: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ForwardError {
    /// Metric label for the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Send(e) if e.is_connect() => "connect",
            Self::Send(e) if e.is_timeout() => "timeout",
            Self::Send(_) => "send",
            Self::Read(_) => "read",
            Self::Decode(_) => "decode",
        }
    }
}

/// Render an error with its source chain, e.g.
/// `error sending request for url (...): client error (Connect): ...`.
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Issues upstream calls against a fixed origin.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    origin: String,
}

impl Forwarder {
    pub fn new(origin: &str) -> Result<Self, reqwest::Error> {
        // Upstream is addressed directly, never through an environment proxy.
        let client = reqwest::Client::builder().no_proxy().build()?;
        Ok(Self {
            client,
            origin: origin.trim_end_matches('/').to_string(),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn target_url(&self, request: &InboundRequest) -> String {
        build_target_url(&self.origin, &request.path, request.query.as_deref())
    }

    /// Forward one request and read the whole upstream reply.
    pub async fn forward(&self, request: &InboundRequest) -> Result<UpstreamReply, ForwardError> {
        let target = self.target_url(request);

        let mut builder = self
            .client
            .request(request.method.as_method(), &target)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = outbound_body(request.method, request.body.as_ref()) {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(ForwardError::Send)?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = response.bytes().await.map_err(ForwardError::Read)?;

        tracing::debug!(
            target_url = %target,
            status = %status,
            content_type = ?content_type,
            bytes = bytes.len(),
            "Upstream responded"
        );

        let body = UpstreamBody::decode(content_type.as_deref(), &bytes)?;
        Ok(UpstreamReply { status, body })
    }
}
