//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all forwarding handler
//! - Wire up middleware (request ID, tracing, CORS)
//! - Bind server to listener and serve until shutdown
//!
//! # Design Decisions
//! - The handler takes the raw `Request<Body>`: no extractor consumes or
//!   buffers the body before the forwarder streams it
//! - One `Forwarder` per server, shared by every request task

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::forwarder::{Forwarder, SetupError};
use crate::http::middleware::cors_layer;
use crate::http::request::{request_id, UuidRequestId};
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, SetupError> {
        let forwarder = Arc::new(Forwarder::new(&config)?);

        tracing::info!(
            upstream = %forwarder.base_url(),
            path_mode = ?forwarder.path_mode(),
            redirects = ?config.upstream.redirects,
            hardened = forwarder.is_hardened(),
            "Forwarder ready"
        );

        let router = Self::build_router(&config, AppState { forwarder });
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(cors_layer(&config.cors)),
            )
    }

    /// The fully layered router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: every method, every path goes to the forwarder.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();

    tracing::debug!(
        request_id = %request_id(&request),
        method = %method,
        path = %request.uri().path(),
        "Proxying request"
    );

    let response = state.forwarder.forward(request).await;

    metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    fn server() -> HttpServer {
        let mut config = ProxyConfig::default();
        config.upstream.url = "http://upstream.invalid".into();
        config.timeouts.request_secs = Some(10);
        HttpServer::new(config).unwrap()
    }

    #[tokio::test]
    async fn preflight_gets_cors_headers_and_request_id() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/any/path")
            .header("origin", "https://app.example")
            .header("access-control-request-method", "PUT")
            .body(Body::empty())
            .unwrap();

        let response = server().router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("access-control-allow-methods"));
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn caller_request_id_is_kept() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/")
            .header("x-request-id", "caller-123")
            .body(Body::empty())
            .unwrap();

        let response = server().router().oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "caller-123");
    }

    #[tokio::test]
    async fn root_and_nested_paths_are_routed() {
        for uri in ["/", "/a", "/a/b/c?x=1"] {
            let request = Request::builder()
                .method(Method::GET)
                .uri(uri)
                .body(Body::empty())
                .unwrap();

            let response = server().router().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_GATEWAY, "uri {}", uri);
        }
    }
}
