//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Build the upstream target URL from the inbound URI
//! - Decide whether a method carries a body upstream
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Target URL is built fresh per request from the immutable base URL

use axum::http::{HeaderName, HeaderValue, Method, Request, Uri};
use tower_http::request_id::{MakeRequestId, RequestId};
use url::Url;
use uuid::Uuid;

use crate::config::PathMode;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Read the request ID set by the middleware, if any.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Build the upstream URL for an inbound URI.
///
/// In [`PathMode::Preserve`] the inbound path and query are appended to the
/// base URL (a trailing `/` on the base is not doubled). In
/// [`PathMode::Collapse`] the base URL is used unchanged.
pub fn target_url(base: &Url, mode: PathMode, uri: &Uri) -> Result<Url, url::ParseError> {
    match mode {
        PathMode::Collapse => Ok(base.clone()),
        PathMode::Preserve => {
            let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
            let base = base.as_str().trim_end_matches('/');
            Url::parse(&format!("{}{}", base, path_and_query))
        }
    }
}

/// `GET` and `HEAD` never send a body upstream; every other method streams one.
pub fn carries_body(method: &Method) -> bool {
    method != Method::GET && method != Method::HEAD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn preserve_appends_path_and_query() {
        let base = Url::parse("https://origin.example").unwrap();
        let target = target_url(&base, PathMode::Preserve, &uri("/upload/v2?id=7&x=%20y")).unwrap();
        assert_eq!(target.as_str(), "https://origin.example/upload/v2?id=7&x=%20y");
    }

    #[test]
    fn preserve_keeps_base_path_prefix() {
        let base = Url::parse("http://127.0.0.1:3000/api/").unwrap();
        let target = target_url(&base, PathMode::Preserve, &uri("/v1/items")).unwrap();
        assert_eq!(target.as_str(), "http://127.0.0.1:3000/api/v1/items");
    }

    #[test]
    fn preserve_root_maps_to_base() {
        let base = Url::parse("https://origin.example").unwrap();
        let target = target_url(&base, PathMode::Preserve, &uri("/")).unwrap();
        assert_eq!(target.as_str(), "https://origin.example/");
    }

    #[test]
    fn collapse_ignores_inbound_path() {
        let base = Url::parse("https://origin.example/upload").unwrap();
        let target = target_url(&base, PathMode::Collapse, &uri("/anything/else?q=1")).unwrap();
        assert_eq!(target, base);
    }

    #[test]
    fn only_get_and_head_are_bodiless() {
        assert!(!carries_body(&Method::GET));
        assert!(!carries_body(&Method::HEAD));
        assert!(carries_body(&Method::POST));
        assert!(carries_body(&Method::PUT));
        assert!(carries_body(&Method::DELETE));
        assert!(carries_body(&Method::from_bytes(b"PURGE").unwrap()));
    }

    #[test]
    fn request_ids_are_unique_uuids() {
        let request = Request::new(());
        let mut maker = UuidRequestId;
        let a = maker.make_request_id(&request).unwrap();
        let b = maker.make_request_id(&request).unwrap();
        assert_ne!(a.header_value(), b.header_value());
        assert!(Uuid::parse_str(a.header_value().to_str().unwrap()).is_ok());
    }
}
