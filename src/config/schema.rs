//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single upstream origin and how requests reach it.
    pub upstream: UpstreamConfig,

    /// Upstream timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Provenance suppression and browser mimicry.
    pub hardening: HardeningConfig,

    /// CORS policy applied at the boundary.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// How the inbound path maps onto the upstream URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PathMode {
    /// Upstream URL is the base URL followed by the inbound path and query.
    #[default]
    Preserve,
    /// Every request goes to the base URL as-is.
    Collapse,
}

/// Whether upstream redirects are followed or handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RedirectMode {
    /// Relay the redirect status and `Location` verbatim.
    #[default]
    Manual,
    /// Follow redirects and relay the final response.
    Follow,
}

/// Upstream origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream base URL (e.g., "https://origin.example").
    pub url: String,

    /// Target URL construction mode.
    pub path_mode: PathMode,

    /// Redirect policy.
    pub redirects: RedirectMode,

    /// Maximum redirect hops when `redirects = "follow"`.
    pub max_redirects: usize,

    /// Drop the inbound `Content-Length` and let the transport re-frame the body.
    pub strip_content_length: bool,

    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` for upstream connections.
    pub use_system_proxy: bool,

    /// Buffer and log failed upstream response bodies.
    pub inspect_error_bodies: bool,

    /// Characters of an inspected error body written to the log.
    pub error_log_limit: usize,

    /// Bytes of an error body buffered for inspection before streaming resumes.
    pub error_body_max_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3000".to_string(),
            path_mode: PathMode::Preserve,
            redirects: RedirectMode::Manual,
            max_redirects: 10,
            strip_content_length: false,
            use_system_proxy: false,
            inspect_error_bodies: false,
            error_log_limit: 500,
            error_body_max_bytes: 1024 * 1024,
        }
    }
}

/// Timeout configuration for upstream calls.
///
/// Both values are unset by default: the relay does not impose a deadline
/// unless one is configured.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: Option<u64>,

    /// Total upstream request timeout (including body streaming) in seconds.
    pub request_secs: Option<u64>,
}

/// Hardened mode: hide proxy provenance and present as a browser.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HardeningConfig {
    /// Enable hardened mode.
    pub enabled: bool,

    /// Inbound headers removed before forwarding.
    pub strip_headers: Vec<String>,

    /// Fixed `User-Agent` sent upstream.
    pub user_agent: String,

    /// Fixed `Accept` sent upstream.
    pub accept: String,

    /// Fixed `Accept-Language` sent upstream.
    pub accept_language: String,

    /// Fixed `Cache-Control` sent upstream.
    pub cache_control: String,
}

impl Default for HardeningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strip_headers: ["origin", "referer", "forwarded", "via", "x-forwarded-for"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            cache_control: "no-cache".to_string(),
        }
    }
}

/// CORS policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Methods advertised in `Access-Control-Allow-Methods`.
    pub allowed_methods: Vec<String>,

    /// Headers advertised in `Access-Control-Allow-Headers`.
    pub allowed_headers: Vec<String>,

    /// Headers advertised in `Access-Control-Expose-Headers`.
    pub exposed_headers: Vec<String>,

    /// Send `Access-Control-Allow-Credentials: true`.
    ///
    /// Credentials cannot be combined with a wildcard origin, so when enabled
    /// the request's `Origin` is mirrored back instead of `*`.
    pub allow_credentials: bool,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allowed_headers: [
                "content-type",
                "authorization",
                "x-requested-with",
                "accept",
                "content-length",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
            exposed_headers: ["content-length", "content-type"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            allow_credentials: true,
            max_age_secs: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
