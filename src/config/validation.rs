//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Reject CORS combinations the middleware cannot honour
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use axum::http::{HeaderName, HeaderValue, Method};

use crate::config::schema::ServiceConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let service = &config.service;
    if service.project_name.trim().is_empty() {
        errors.push(ValidationError::new("service.project_name", "must not be empty"));
    }
    let prefix = &service.api_prefix;
    if !prefix.is_empty() && (!prefix.starts_with('/') || prefix.ends_with('/')) {
        errors.push(ValidationError::new(
            "service.api_prefix",
            "must be empty or start with '/' and not end with '/'",
        ));
    }
    if service.port == 0 {
        errors.push(ValidationError::new("service.port", "must be non-zero"));
    }
    if service.host.trim().is_empty() {
        errors.push(ValidationError::new("service.host", "must not be empty"));
    }

    if config.http.request_timeout_secs == 0 {
        errors.push(ValidationError::new("http.request_timeout_secs", "must be > 0"));
    }

    if config.lifecycle.startup_step_timeout_secs == 0 {
        errors.push(ValidationError::new("lifecycle.startup_step_timeout_secs", "must be > 0"));
    }
    if config.lifecycle.shutdown_step_timeout_secs == 0 {
        errors.push(ValidationError::new("lifecycle.shutdown_step_timeout_secs", "must be > 0"));
    }

    validate_cors(config, &mut errors);

    let db = &config.database;
    if db.url.trim().is_empty() {
        errors.push(ValidationError::new("database.url", "must not be empty"));
    }
    if db.max_connections == 0 {
        errors.push(ValidationError::new("database.max_connections", "must be > 0"));
    }
    if db.min_connections > db.max_connections {
        errors.push(ValidationError::new(
            "database.min_connections",
            "must not exceed max_connections",
        ));
    }
    if db.acquire_timeout_secs == 0 {
        errors.push(ValidationError::new("database.acquire_timeout_secs", "must be > 0"));
    }

    let broker = &config.broker;
    if broker.url.trim().is_empty() {
        errors.push(ValidationError::new("broker.url", "must not be empty"));
    }
    if broker.prefetch == 0 {
        errors.push(ValidationError::new("broker.prefetch", "must be > 0"));
    }
    if broker.reconnect_base_delay_ms > broker.reconnect_max_delay_ms {
        errors.push(ValidationError::new(
            "broker.reconnect_base_delay_ms",
            "must not exceed reconnect_max_delay_ms",
        ));
    }
    if broker.consumers.is_empty() {
        errors.push(ValidationError::new("broker.consumers", "at least one consumer is required"));
    }
    let mut seen = HashSet::new();
    for (i, consumer) in broker.consumers.iter().enumerate() {
        if consumer.stream.trim().is_empty() || consumer.group.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("broker.consumers[{}]", i),
                "stream and group must not be empty",
            ));
        }
        if !seen.insert(consumer.stream.as_str()) {
            errors.push(ValidationError::new(
                format!("broker.consumers[{}].stream", i),
                format!("duplicate stream '{}'", consumer.stream),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<std::net::SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address when metrics are enabled",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_cors(config: &ServiceConfig, errors: &mut Vec<ValidationError>) {
    let cors = &config.cors;

    if cors.allowed_origins.is_empty() {
        errors.push(ValidationError::new("cors.allowed_origins", "must not be empty"));
    }
    let wildcard_origin = cors.allowed_origins.iter().any(|o| o == "*");
    if wildcard_origin && cors.allow_credentials {
        errors.push(ValidationError::new(
            "cors.allowed_origins",
            "wildcard origin cannot be combined with allow_credentials",
        ));
    }
    for origin in cors.allowed_origins.iter().filter(|o| *o != "*") {
        if HeaderValue::from_str(origin).is_err() {
            errors.push(ValidationError::new(
                "cors.allowed_origins",
                format!("invalid origin '{}'", origin),
            ));
        }
    }
    for method in cors.allowed_methods.iter().filter(|m| *m != "*") {
        if Method::from_bytes(method.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "cors.allowed_methods",
                format!("invalid method '{}'", method),
            ));
        }
    }
    for header in cors.allowed_headers.iter().filter(|h| *h != "*") {
        if HeaderName::from_bytes(header.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "cors.allowed_headers",
                format!("invalid header '{}'", header),
            ));
        }
    }
}
