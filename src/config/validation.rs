//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the upstream URL and listener addresses
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check that configured header names, values and methods are well-formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue, Method};
use url::Url;

use crate::config::schema::{PathMode, ProxyConfig, RedirectMode};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("upstream.url `{url}` is not a valid URL: {reason}")]
    UpstreamUrl { url: String, reason: String },

    #[error("upstream.url scheme `{0}` is not supported (expected http or https)")]
    UpstreamScheme(String),

    #[error("upstream.url must not carry a fragment")]
    UpstreamFragment,

    #[error("upstream.url must not carry a query when path_mode = \"preserve\"")]
    UpstreamQuery,

    #[error("{field} `{value}` is not a valid socket address")]
    Address { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{field} contains invalid header name `{value}`")]
    HeaderName { field: &'static str, value: String },

    #[error("{field} is not a valid header value")]
    HeaderValue { field: &'static str },

    #[error("cors.allowed_methods contains invalid method `{0}`")]
    Method(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_upstream(config, &mut errors);
    validate_address(
        "listener.bind_address",
        &config.listener.bind_address,
        &mut errors,
    );
    if config.observability.metrics_enabled {
        validate_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    if config.timeouts.connect_secs == Some(0) {
        errors.push(ValidationError::Zero("timeouts.connect_secs"));
    }
    if config.timeouts.request_secs == Some(0) {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    if config.hardening.enabled {
        validate_header_names(
            "hardening.strip_headers",
            &config.hardening.strip_headers,
            &mut errors,
        );
        let fixed = [
            ("hardening.user_agent", &config.hardening.user_agent),
            ("hardening.accept", &config.hardening.accept),
            ("hardening.accept_language", &config.hardening.accept_language),
            ("hardening.cache_control", &config.hardening.cache_control),
        ];
        for (field, value) in fixed {
            if HeaderValue::from_str(value).is_err() {
                errors.push(ValidationError::HeaderValue { field });
            }
        }
    }

    validate_header_names("cors.allowed_headers", &config.cors.allowed_headers, &mut errors);
    validate_header_names("cors.exposed_headers", &config.cors.exposed_headers, &mut errors);
    for method in &config.cors.allowed_methods {
        if Method::from_bytes(method.as_bytes()).is_err() {
            errors.push(ValidationError::Method(method.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_upstream(config: &ProxyConfig, errors: &mut Vec<ValidationError>) {
    let upstream = &config.upstream;

    match Url::parse(&upstream.url) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                errors.push(ValidationError::UpstreamScheme(url.scheme().to_string()));
            }
            if url.fragment().is_some() {
                errors.push(ValidationError::UpstreamFragment);
            }
            if url.query().is_some() && upstream.path_mode == PathMode::Preserve {
                errors.push(ValidationError::UpstreamQuery);
            }
        }
        Err(e) => errors.push(ValidationError::UpstreamUrl {
            url: upstream.url.clone(),
            reason: e.to_string(),
        }),
    }

    if upstream.redirects == RedirectMode::Follow && upstream.max_redirects == 0 {
        errors.push(ValidationError::Zero("upstream.max_redirects"));
    }
    if upstream.error_log_limit == 0 {
        errors.push(ValidationError::Zero("upstream.error_log_limit"));
    }
    if upstream.error_body_max_bytes == 0 {
        errors.push(ValidationError::Zero("upstream.error_body_max_bytes"));
    }
}

fn validate_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field,
            value: value.to_string(),
        });
    }
}

fn validate_header_names(field: &'static str, names: &[String], errors: &mut Vec<ValidationError>) {
    for name in names {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::HeaderName {
                field,
                value: name.clone(),
            });
        }
    }
}
