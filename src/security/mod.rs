//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request headers:
//!     → headers.rs (drop Host, hop-by-hop, optional Content-Length)
//!     → headers.rs (hardened mode: drop provenance, pin browser headers)
//!     → Outbound request
//! ```
//!
//! # Design Decisions
//! - Everything not explicitly dropped passes through unchanged
//! - Hardened overrides are applied after filtering so they always win

pub mod headers;

pub use headers::{HeaderPolicy, HeaderPolicyError};
