//! CORS policy at the boundary.
//!
//! Upstream `access-control-*` headers are removed by the forwarder, so the
//! headers produced here are the only CORS headers a client ever sees.

use std::time::Duration;

use axum::http::{HeaderName, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::CorsConfig;

/// Build the CORS layer from configuration.
///
/// Entries that do not parse are skipped; validation rejects them earlier.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|m| Method::from_bytes(m.as_bytes()).ok())
        .collect();
    let allowed: Vec<HeaderName> = config
        .allowed_headers
        .iter()
        .filter_map(|h| HeaderName::from_bytes(h.as_bytes()).ok())
        .collect();
    let exposed: Vec<HeaderName> = config
        .exposed_headers
        .iter()
        .filter_map(|h| HeaderName::from_bytes(h.as_bytes()).ok())
        .collect();

    let mut layer = CorsLayer::new()
        .allow_methods(methods)
        .allow_headers(allowed)
        .expose_headers(exposed);

    // `*` is not allowed together with credentials; mirror the caller instead.
    layer = if config.allow_credentials {
        layer
            .allow_origin(AllowOrigin::mirror_request())
            .allow_credentials(true)
    } else {
        layer.allow_origin(Any)
    };

    if let Some(secs) = config.max_age_secs {
        layer = layer.max_age(Duration::from_secs(secs));
    }

    layer
}
