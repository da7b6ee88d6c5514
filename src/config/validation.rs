//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (window > 0, budget > 0, addresses parse)
//! - Check the upstream address is usable as a URI authority
//! - Check bypass prefixes are absolute paths
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::uri::Authority;

use crate::config::schema::GateConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.upstream.address.parse::<Authority>().is_err() {
        errors.push(ValidationError::new(
            "upstream.address",
            format!("'{}' is not a host:port authority", config.upstream.address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.rate_limit.window_size_ms == 0 {
        errors.push(ValidationError::new("rate_limit.window_size_ms", "must be greater than 0"));
    }

    if config.rate_limit.max_requests_per_window == 0 {
        errors.push(ValidationError::new(
            "rate_limit.max_requests_per_window",
            "must be greater than 0",
        ));
    }

    for prefix in &config.bypass.prefixes {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::new(
                "bypass.prefixes",
                format!("'{prefix}' must start with '/'"),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
