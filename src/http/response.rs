//! Response construction for the client.
//!
//! # Responsibilities
//! - Relay upstream status and body with the fixed gateway header set
//! - Build the structured 500 body when the upstream is unreachable
//! - Local rejections (405, 413) that never reach the upstream
//!
//! # Design Decisions
//! - Relayed responses are always labeled `application/json`, even when the
//!   upstream body was plain text
//! - Upstream headers other than status and content-type are dropped
//! - The failure response carries CORS headers only when configured to

use axum::{
    body::Body,
    http::{
        header::{
            HeaderMap, HeaderValue, InvalidHeaderValue, ACCESS_CONTROL_ALLOW_HEADERS,
            ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW, CONTENT_TYPE,
        },
        StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::config::CorsConfig;
use crate::http::forward::{UpstreamReply, ALLOWED_METHODS};

/// Pre-validated CORS header values.
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    allow_origin: HeaderValue,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
}

impl CorsHeaders {
    pub fn from_config(config: &CorsConfig) -> Result<Self, InvalidHeaderValue> {
        Ok(Self {
            allow_origin: HeaderValue::from_str(&config.allow_origin)?,
            allow_methods: HeaderValue::from_str(&config.allow_methods)?,
            allow_headers: HeaderValue::from_str(&config.allow_headers)?,
        })
    }

    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
    }
}

/// Relay an upstream reply to the client.
pub fn relay(reply: UpstreamReply, cors: &CorsHeaders) -> Response {
    let mut response = Response::new(Body::from(reply.body.into_bytes()));
    *response.status_mut() = reply.status;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    cors.apply(headers);
    response
}

/// Body of the 500 response sent when the upstream could not be reached.
pub fn failure_body(message: &str, backend: &str) -> Value {
    json!({
        "error": "Backend connection failed",
        "message": message,
        "backend": backend,
    })
}

/// 500 response for a failed upstream attempt.
pub fn backend_failure(message: &str, backend: &str, cors: Option<&CorsHeaders>) -> Response {
    let mut response =
        (StatusCode::INTERNAL_SERVER_ERROR, Json(failure_body(message, backend))).into_response();
    if let Some(cors) = cors {
        cors.apply(response.headers_mut());
    }
    response
}

pub fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(ALLOW, ALLOWED_METHODS)],
        "Method not allowed",
    )
        .into_response()
}

pub fn payload_too_large(limit: usize) -> Response {
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        format!("Request body exceeds {} bytes", limit),
    )
        .into_response()
}
