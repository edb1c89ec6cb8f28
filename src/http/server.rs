//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router mounting the gateway under the configured prefix
//! - Wire up middleware (request ID, tracing, optional host timeout)
//! - Bind server to listener with graceful shutdown
//! - Swap the gateway state when a reloaded configuration arrives
//! - Forward requests to the upstream and relay the answer

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{header::InvalidHeaderValue, Request},
    response::Response,
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::forward::{parse_inbound_body, path_fragment, ForwardMethod, Forwarder, InboundRequest};
use crate::http::request::{self, request_id_header, MakeRequestUuidV4};
use crate::http::response::{self, CorsHeaders};
use crate::observability::metrics;

/// Errors building the gateway state.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid CORS header value: {0}")]
    Cors(#[from] InvalidHeaderValue),
}

/// Everything a request needs, built from one configuration.
#[derive(Debug)]
pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub forwarder: Forwarder,
    pub cors: CorsHeaders,
}

impl GatewayState {
    pub fn from_config(config: GatewayConfig) -> Result<Self, ServerError> {
        let forwarder = Forwarder::new(&config.upstream.origin)?;
        let cors = CorsHeaders::from_config(&config.cors)?;
        Ok(Self {
            config: Arc::new(config),
            forwarder,
            cors,
        })
    }

    fn failure_cors(&self) -> Option<&CorsHeaders> {
        self.config.cors.include_on_failure.then_some(&self.cors)
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<GatewayState>>,
    /// Prefix the router was built with; fixed for the server's lifetime.
    mount_prefix: Arc<str>,
}

impl AppState {
    fn new(state: GatewayState) -> Self {
        let mount_prefix = Arc::from(state.config.upstream.normalized_prefix());
        Self {
            inner: Arc::new(ArcSwap::from_pointee(state)),
            mount_prefix,
        }
    }

    /// Replace the gateway state with one built from `config`. In-flight
    /// requests keep the snapshot they started with.
    pub fn apply_update(&self, config: GatewayConfig) -> Result<(), ServerError> {
        let current = self.inner.load_full();
        if config.listener != current.config.listener
            || config.upstream.normalized_prefix() != self.mount_prefix.as_ref()
            || config.timeouts != current.config.timeouts
            || config.observability != current.config.observability
        {
            tracing::warn!(
                "Listener, mount prefix, timeout and observability changes take effect after restart"
            );
        }

        let next = GatewayState::from_config(config)?;
        tracing::info!(upstream = %next.forwarder.origin(), "Configuration reloaded");
        self.inner.store(Arc::new(next));
        Ok(())
    }
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    state: AppState,
}

impl GatewayServer {
    /// Create a new gateway server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        let state = AppState::new(GatewayState::from_config(config.clone())?);
        let router = Self::build_router(&config, state.clone());
        Ok(Self {
            router,
            config,
            state,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let prefix = config.upstream.normalized_prefix();

        let mut router = if prefix.is_empty() {
            Router::new()
                .route("/", any(forward_handler))
                .route("/{*rest}", any(forward_handler))
        } else {
            Router::new()
                .route(prefix, any(forward_handler))
                .route(&format!("{}/", prefix), any(forward_handler))
                .route(&format!("{}/{{*rest}}", prefix), any(forward_handler))
        }
        .with_state(state);

        if let Some(secs) = config.timeouts.request_secs {
            router = router.layer(TimeoutLayer::new(Duration::from_secs(secs)));
        }

        router
            .layer(PropagateRequestIdLayer::new(request_id_header()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id_header(), MakeRequestUuidV4))
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mount_prefix = %self.state.mount_prefix,
            upstream = %self.config.upstream.origin,
            "HTTP server starting"
        );

        let state = self.state.clone();
        let reload = tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                if let Err(e) = state.apply_update(new_config) {
                    tracing::error!(error = %e, "Rejected reloaded configuration, keeping current");
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reload.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for driving the gateway without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Handle for swapping configuration from outside the server loop.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }
}

/// Gateway handler: one inbound request, one upstream attempt.
async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let snapshot = state.inner.load_full();
    let request_id = request::request_id(request.headers()).to_string();
    let method_str = request.method().to_string();

    let Some(method) = ForwardMethod::from_method(request.method()) else {
        tracing::warn!(request_id = %request_id, method = %method_str, "Method not allowed");
        metrics::record_request(&method_str, 405, start_time);
        return response::method_not_allowed();
    };

    let path = path_fragment(request.uri().path(), &state.mount_prefix).to_string();
    let query = request.uri().query().map(str::to_owned);

    let limit = snapshot.config.limits.max_body_bytes;
    let body = match axum::body::to_bytes(request.into_body(), limit).await {
        Ok(bytes) => parse_inbound_body(&bytes),
        Err(e) => {
            tracing::warn!(request_id = %request_id, limit, error = %e, "Inbound body rejected");
            metrics::record_request(&method_str, 413, start_time);
            return response::payload_too_large(limit);
        }
    };

    let inbound = InboundRequest {
        method,
        path,
        query,
        body,
    };

    tracing::info!(
        request_id = %request_id,
        method = %method,
        target = %snapshot.forwarder.target_url(&inbound),
        "Proxying request"
    );

    match snapshot.forwarder.forward(&inbound).await {
        Ok(reply) => {
            metrics::record_request(&method_str, reply.status.as_u16(), start_time);
            response::relay(reply, &snapshot.cors)
        }
        Err(e) => {
            let message = e.to_string();
            tracing::error!(
                request_id = %request_id,
                backend = %snapshot.forwarder.origin(),
                error = %message,
                "Proxy error"
            );
            metrics::record_upstream_failure(e.kind());
            metrics::record_request(&method_str, 500, start_time);
            response::backend_failure(&message, snapshot.forwarder.origin(), snapshot.failure_cors())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn server() -> GatewayServer {
        GatewayServer::new(GatewayConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_unsupported_method_rejected_locally() {
        let response = server()
            .router()
            .oneshot(
                Request::builder()
                    .method("HEAD")
                    .uri("/api/members/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(response.headers().contains_key(request::X_REQUEST_ID));
    }

    #[tokio::test]
    async fn test_paths_outside_prefix_not_found() {
        let response = server()
            .router()
            .oneshot(Request::builder().uri("/members/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_client_request_id_preserved() {
        let response = server()
            .router()
            .oneshot(
                Request::builder()
                    .method("TRACE")
                    .uri("/api")
                    .header(request::X_REQUEST_ID, "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[request::X_REQUEST_ID], "req-42");
    }

    #[test]
    fn test_apply_update_swaps_upstream() {
        let server = server();
        let state = server.state();

        let mut config = GatewayConfig::default();
        config.upstream.origin = "http://10.9.8.7:8000".into();
        config.cors.include_on_failure = true;
        state.apply_update(config).unwrap();

        let snapshot = state.inner.load();
        assert_eq!(snapshot.forwarder.origin(), "http://10.9.8.7:8000");
        assert!(snapshot.failure_cors().is_some());
    }

    #[test]
    fn test_apply_update_rejects_bad_cors() {
        let server = server();
        let state = server.state();

        let mut config = GatewayConfig::default();
        config.cors.allow_headers = "Content-Type\r\n".into();
        assert!(matches!(state.apply_update(config), Err(ServerError::Cors(_))));
        assert_eq!(state.inner.load().forwarder.origin(), "http://localhost:8000");
    }

    #[test]
    fn test_root_mount_builds() {
        let mut config = GatewayConfig::default();
        config.upstream.mount_prefix = "/".into();
        let server = GatewayServer::new(config).unwrap();
        assert_eq!(server.state().mount_prefix.as_ref(), "");
    }
}
