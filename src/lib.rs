//! Streaming reverse relay for a single fixed upstream origin.
//!
//! Every inbound request (any method, any path) is forwarded to the configured
//! upstream with its body streamed through untouched; the upstream's status,
//! safe headers and body are streamed back. `OPTIONS` is answered locally and
//! transport failures become a structured `502`.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::{Forwarder, HttpServer};
pub use lifecycle::Shutdown;
