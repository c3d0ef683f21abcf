//! Response handling and transformation.
//!
//! # Responsibilities
//! - Filter upstream response headers for the client
//! - Answer preflight requests locally
//! - Map forwarding failures to `502 Bad Gateway` with a JSON payload
//!
//! # Design Decisions
//! - The relay's own CORS policy wins: upstream `access-control-*` is dropped
//! - `Content-Encoding` is never relayed; the client decodes known encodings
//! - Hop-by-hop headers stripped automatically

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::http::forwarder::ForwardError;
use crate::security::headers::{connection_options, is_hop_by_hop};

const CORS_PREFIX: &str = "access-control-";

/// Whether a header belongs to the CORS family.
pub fn is_cors_header(name: &HeaderName) -> bool {
    name.as_str()
        .get(..CORS_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(CORS_PREFIX))
}

/// Copy upstream response headers that are safe to hand to the client.
pub fn relay_headers(upstream: &HeaderMap) -> HeaderMap {
    let options = connection_options(upstream);
    let mut headers = HeaderMap::with_capacity(upstream.len());

    for (name, value) in upstream {
        if is_cors_header(name)
            || *name == header::CONTENT_ENCODING
            || is_hop_by_hop(name)
            || options.contains(name)
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    headers
}

/// `200 OK` with an empty body, never forwarded upstream.
pub fn preflight() -> Response {
    (StatusCode::OK, Body::empty()).into_response()
}

/// JSON payload returned when the upstream cannot be reached.
#[derive(Debug, Serialize)]
pub struct GatewayError {
    pub error: &'static str,
    pub kind: &'static str,
    pub message: &'static str,
    pub details: String,
}

impl From<&ForwardError> for GatewayError {
    fn from(err: &ForwardError) -> Self {
        Self {
            error: "Gateway Error",
            kind: err.kind(),
            message: err.message(),
            details: err.details(),
        }
    }
}

/// `502 Bad Gateway` describing a failed forward.
pub fn bad_gateway(err: &ForwardError) -> Response {
    (StatusCode::BAD_GATEWAY, Json(GatewayError::from(err))).into_response()
}
