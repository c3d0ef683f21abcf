//! Header manipulation on the way upstream.
//!
//! # Responsibilities
//! - Strip `Host` so the client sets the upstream's own authority
//! - Strip hop-by-hop headers (and anything listed in `Connection`)
//! - Strip `Accept-Encoding`: the upstream client negotiates and decodes
//!   compression itself, so `Content-Encoding` is never relayed
//! - Strip `Content-Length` when no body is sent (`GET`, `HEAD`), and
//!   optionally whenever the body may be re-framed
//! - Hardened mode: strip provenance headers, pin browser-like headers
//!
//! # Design Decisions
//! - Rules are compiled once from config; `outbound` is a pure function
//! - Repeated headers keep their order and multiplicity
//! - Hardened overrides run last and always win

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};

use crate::config::{HardeningConfig, UpstreamConfig};
use crate::http::request::carries_body;

/// Headers that only describe a single transport hop.
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Whether a header is hop-by-hop and must not cross the relay.
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.iter().any(|h| name.as_str().eq_ignore_ascii_case(h))
}

/// Header names listed as connection options in a `Connection` header.
pub fn connection_options(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect()
}

/// Error building a header policy from configuration.
#[derive(Debug, thiserror::Error)]
pub enum HeaderPolicyError {
    #[error("invalid header name `{0}`")]
    Name(String),

    #[error("invalid value for header `{0}`")]
    Value(&'static str),
}

#[derive(Debug, Clone)]
struct Hardening {
    strip: Vec<HeaderName>,
    pinned: Vec<(HeaderName, HeaderValue)>,
}

impl Hardening {
    fn from_config(config: &HardeningConfig) -> Result<Self, HeaderPolicyError> {
        let strip = config
            .strip_headers
            .iter()
            .map(|name| {
                HeaderName::from_bytes(name.as_bytes()).map_err(|_| HeaderPolicyError::Name(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let fixed = [
            (header::USER_AGENT, "user-agent", &config.user_agent),
            (header::ACCEPT, "accept", &config.accept),
            (header::ACCEPT_LANGUAGE, "accept-language", &config.accept_language),
            (header::CACHE_CONTROL, "cache-control", &config.cache_control),
        ];
        let pinned = fixed
            .into_iter()
            .map(|(name, label, value)| {
                HeaderValue::from_str(value)
                    .map(|value| (name, value))
                    .map_err(|_| HeaderPolicyError::Value(label))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { strip, pinned })
    }
}

/// Inbound → outbound header rules.
#[derive(Debug, Clone, Default)]
pub struct HeaderPolicy {
    strip_content_length: bool,
    hardening: Option<Hardening>,
}

impl HeaderPolicy {
    /// Compile the policy from the upstream and hardening sections.
    pub fn from_config(
        upstream: &UpstreamConfig,
        hardening: &HardeningConfig,
    ) -> Result<Self, HeaderPolicyError> {
        let hardening = if hardening.enabled {
            Some(Hardening::from_config(hardening)?)
        } else {
            None
        };

        Ok(Self {
            strip_content_length: upstream.strip_content_length,
            hardening,
        })
    }

    /// Whether hardened mode is active.
    pub fn is_hardened(&self) -> bool {
        self.hardening.is_some()
    }

    /// Build the outbound header map for a `method` request from the inbound one.
    pub fn outbound(&self, method: &Method, inbound: &HeaderMap) -> HeaderMap {
        let options = connection_options(inbound);
        let bodiless = !carries_body(method);
        let mut headers = HeaderMap::with_capacity(inbound.len());

        for (name, value) in inbound {
            if self.drops(name, bodiless) || options.contains(name) {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }

        if let Some(hardening) = &self.hardening {
            for (name, value) in &hardening.pinned {
                headers.insert(name.clone(), value.clone());
            }
        }

        headers
    }

    fn drops(&self, name: &HeaderName, bodiless: bool) -> bool {
        if *name == header::HOST || *name == header::ACCEPT_ENCODING || is_hop_by_hop(name) {
            return true;
        }
        if (bodiless || self.strip_content_length) && *name == header::CONTENT_LENGTH {
            return true;
        }
        self.hardening
            .as_ref()
            .is_some_and(|hardening| hardening.strip.contains(name))
    }
}
