//! Upstream forwarding.
//!
//! # Responsibilities
//! - Build the outbound request: target URL, filtered headers, raw body stream
//! - Dispatch it through the shared upstream client
//! - Relay status, safe headers and the streamed body to the client
//! - Translate failures before the response head into `502 Bad Gateway`
//!
//! # Design Decisions
//! - Constructed once from config, immutable, shared via `Arc` across tasks
//! - Bodies are never buffered on the success path, in either direction
//! - Failures after the response head are logged only; the stream is cut
//! - Dropping the handler future (client went away) drops the upstream call

use std::error::Error as _;
use std::time::Duration;

use axum::{
    body::{Body, Bytes, HttpBody},
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    response::Response,
};
use futures_util::{future, stream, Stream, StreamExt, TryStreamExt};
use reqwest::redirect::Policy;
use url::Url;

use crate::config::{PathMode, ProxyConfig, RedirectMode};
use crate::http::request::{carries_body, target_url};
use crate::http::response::{bad_gateway, preflight, relay_headers};
use crate::observability::metrics;
use crate::security::{HeaderPolicy, HeaderPolicyError};

/// Failure to forward a single request before any response was sent.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("could not build upstream url")]
    InvalidTarget(#[from] url::ParseError),

    #[error("upstream connection failed")]
    Connect(#[source] reqwest::Error),

    #[error("upstream request timed out")]
    Timeout(#[source] reqwest::Error),

    #[error("upstream request failed")]
    Request(#[source] reqwest::Error),
}

impl From<reqwest::Error> for ForwardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ForwardError::Timeout(err)
        } else if err.is_connect() {
            ForwardError::Connect(err)
        } else {
            ForwardError::Request(err)
        }
    }
}

impl ForwardError {
    /// Short machine-readable label, used in logs, metrics and the 502 payload.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::InvalidTarget(_) => "invalid_target",
            ForwardError::Connect(_) => "connect",
            ForwardError::Timeout(_) => "timeout",
            ForwardError::Request(_) => "request",
        }
    }

    /// Human-readable summary for the client.
    pub fn message(&self) -> &'static str {
        match self {
            ForwardError::InvalidTarget(_) => "Failed to build the upstream request URL.",
            ForwardError::Connect(_) => "Failed to establish connection to upstream server.",
            ForwardError::Timeout(_) => "Upstream server did not respond in time.",
            ForwardError::Request(_) => "Request to upstream server failed.",
        }
    }

    /// The underlying cause chain, joined with `": "`.
    pub fn details(&self) -> String {
        let mut parts = Vec::new();
        let mut current = self.source();
        while let Some(err) = current {
            parts.push(err.to_string());
            current = err.source();
        }
        parts.join(": ")
    }
}

/// Failure to build a [`Forwarder`] from configuration.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("invalid upstream url: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Headers(#[from] HeaderPolicyError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy)]
struct Inspection {
    log_limit: usize,
    max_bytes: usize,
}

/// Translates inbound requests into upstream requests and relays the result.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    base_url: Url,
    path_mode: PathMode,
    headers: HeaderPolicy,
    inspection: Option<Inspection>,
}

impl Forwarder {
    /// Build a forwarder and its upstream client.
    pub fn new(config: &ProxyConfig) -> Result<Self, SetupError> {
        let upstream = &config.upstream;
        let inspection = upstream.inspect_error_bodies.then_some(Inspection {
            log_limit: upstream.error_log_limit,
            max_bytes: upstream.error_body_max_bytes,
        });

        Ok(Self {
            client: build_client(config)?,
            base_url: Url::parse(&upstream.url)?,
            path_mode: upstream.path_mode,
            headers: HeaderPolicy::from_config(upstream, &config.hardening)?,
            inspection,
        })
    }

    /// The configured upstream base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The configured target URL construction mode.
    pub fn path_mode(&self) -> PathMode {
        self.path_mode
    }

    /// Whether hardened header rules are active.
    pub fn is_hardened(&self) -> bool {
        self.headers.is_hardened()
    }

    /// Forward one request. Never fails: errors become a `502` response.
    ///
    /// The body must be the unread inbound stream.
    pub async fn forward(&self, request: Request<Body>) -> Response {
        if request.method() == Method::OPTIONS {
            tracing::debug!(path = %request.uri().path(), "Answering preflight locally");
            metrics::record_preflight();
            return preflight();
        }

        let target = match target_url(&self.base_url, self.path_mode, request.uri()) {
            Ok(target) => target,
            Err(e) => {
                let err = ForwardError::from(e);
                tracing::error!(uri = %request.uri(), details = %err.details(), "Could not build upstream url");
                metrics::record_upstream_failure(err.kind());
                return bad_gateway(&err);
            }
        };

        tracing::debug!(method = %request.method(), upstream_url = %target, "Dispatching upstream");

        match self.dispatch(request, &target).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(
                    upstream_url = %target,
                    kind = err.kind(),
                    details = %err.details(),
                    "Upstream request failed"
                );
                metrics::record_upstream_failure(err.kind());
                bad_gateway(&err)
            }
        }
    }

    async fn dispatch(&self, request: Request<Body>, target: &Url) -> Result<Response, ForwardError> {
        let (parts, body) = request.into_parts();

        let mut outbound = self
            .client
            .request(parts.method.clone(), target.clone())
            .headers(self.headers.outbound(&parts.method, &parts.headers));
        if carries_body(&parts.method) && !body.is_end_stream() {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream = outbound.send().await?;
        let status = upstream.status();
        let mut headers = relay_headers(upstream.headers());

        let failed = !status.is_success() && !status.is_redirection();
        if failed {
            tracing::warn!(status = status.as_u16(), upstream_url = %target, "Upstream returned error status");
        }

        let body = match self.inspection {
            Some(inspection) if failed => {
                inspect_error_body(inspection, status, target, &mut headers, upstream).await?
            }
            _ => stream_body(upstream.bytes_stream(), target.clone()),
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

fn build_client(config: &ProxyConfig) -> reqwest::Result<reqwest::Client> {
    let redirect = match config.upstream.redirects {
        RedirectMode::Manual => Policy::none(),
        RedirectMode::Follow => Policy::limited(config.upstream.max_redirects),
    };

    let mut builder = reqwest::Client::builder().redirect(redirect);
    if !config.upstream.use_system_proxy {
        builder = builder.no_proxy();
    }
    if let Some(secs) = config.timeouts.connect_secs {
        builder = builder.connect_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = config.timeouts.request_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    builder.build()
}

/// Relay an upstream body stream, logging a failure once the head is sent.
fn stream_body<S>(chunks: S, target: Url) -> Body
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
{
    Body::from_stream(chunks.inspect_err(move |e| {
        tracing::error!(upstream_url = %target, error = %e, "Upstream body failed mid-stream, dropping connection");
        metrics::record_upstream_failure("mid_stream");
    }))
}

/// Buffer up to `max_bytes` of a failed response for the log, then relay it.
///
/// A body longer than the bound is relayed as the buffered prefix followed by
/// the rest of the stream.
async fn inspect_error_body(
    inspection: Inspection,
    status: StatusCode,
    target: &Url,
    headers: &mut HeaderMap,
    upstream: reqwest::Response,
) -> Result<Body, ForwardError> {
    let mut chunks = Box::pin(upstream.bytes_stream());
    let mut buffered = Vec::new();
    let mut complete = false;

    while buffered.len() < inspection.max_bytes {
        match chunks.next().await {
            Some(chunk) => buffered.extend_from_slice(&chunk?),
            None => {
                complete = true;
                break;
            }
        }
    }

    let excerpt: String = String::from_utf8_lossy(&buffered)
        .chars()
        .take(inspection.log_limit)
        .collect();
    tracing::warn!(
        status = status.as_u16(),
        upstream_url = %target,
        body = %excerpt,
        truncated = !complete,
        "Upstream error body"
    );

    if !buffered.is_empty() && !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(sniff_content_type(&buffered, complete)),
        );
    }

    let prefix = Bytes::from(buffered);
    if complete {
        return Ok(Body::from(prefix));
    }

    let rest = stream::once(future::ready(Ok(prefix))).chain(chunks);
    Ok(stream_body(rest, target.clone()))
}

fn sniff_content_type(body: &[u8], complete: bool) -> &'static str {
    if complete && serde_json::from_slice::<serde::de::IgnoredAny>(body).is_ok() {
        "application/json"
    } else if std::str::from_utf8(body).is_ok() {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}
