//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define relay metrics (requests, latency, upstream failures, preflights)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by method, status
//! - `relay_request_duration_seconds` (histogram): time to response head
//! - `relay_upstream_failures_total` (counter): failures by kind
//! - `relay_preflight_total` (counter): locally answered `OPTIONS`
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op
//! - Labels kept low-cardinality: no paths, no upstream URLs

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request head.
pub fn record_request(method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "relay_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    ::metrics::histogram!(
        "relay_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record a proxy-originated failure.
pub fn record_upstream_failure(kind: &'static str) {
    ::metrics::counter!("relay_upstream_failures_total", "kind" => kind).increment(1);
}

/// Record an `OPTIONS` request answered without touching the upstream.
pub fn record_preflight() {
    ::metrics::counter!("relay_preflight_total").increment(1);
}
