//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, CORS)
//!     → forwarder.rs (OPTIONS short-circuit, dispatch upstream)
//!         → request.rs (target URL, body rule)
//!         → security::headers (outbound header policy)
//!     → response.rs (filter upstream headers, or 502 payload)
//!     → Send to client (streamed)
//! ```

pub mod forwarder;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use forwarder::{ForwardError, Forwarder, SetupError};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
