//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, apply CLI overrides)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → consumed once when the Forwarder and router are built
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the upstream is fixed per deployment
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{resolve_config, ConfigError, Overrides};
pub use schema::{
    CorsConfig, HardeningConfig, ListenerConfig, LogFormat, ObservabilityConfig, PathMode,
    ProxyConfig, RedirectMode, TimeoutConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
