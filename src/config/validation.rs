//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ttl > 0, pool size > 0)
//! - Check addresses and header names parse
//!
//! Returns all validation errors, not just the first.

use axum::http::HeaderName;
use std::net::SocketAddr;

use crate::config::schema::RecorderConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
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

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &RecorderConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_addr(&mut errors, "proxy.bind_address", &config.proxy.bind_address);
    check_addr(&mut errors, "query.bind_address", &config.query.bind_address);
    if config.observability.metrics_enabled {
        check_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.proxy.max_body_bytes == 0 {
        errors.push(ValidationError::new("proxy.max_body_bytes", "must be greater than 0"));
    }
    if config.proxy.upstream_timeout_secs == 0 {
        errors.push(ValidationError::new("proxy.upstream_timeout_secs", "must be greater than 0"));
    }

    let scheme = config.store.address.split("://").next().unwrap_or_default();
    if !config.store.address.contains("://") || !matches!(scheme, "redis" | "rediss" | "memory") {
        errors.push(ValidationError::new(
            "store.address",
            format!("unsupported store address '{}'", config.store.address),
        ));
    }
    if config.store.max_size == 0 {
        errors.push(ValidationError::new("store.max_size", "must be greater than 0"));
    }

    let capture = &config.capture;
    if capture.ttl_secs == 0 {
        errors.push(ValidationError::new("capture.ttl_secs", "must be greater than 0"));
    }
    let key = HeaderName::try_from(capture.key_header.as_str());
    let tag = HeaderName::try_from(capture.tag_header.as_str());
    if key.is_err() {
        errors.push(ValidationError::new("capture.key_header", "not a valid header name"));
    }
    if tag.is_err() {
        errors.push(ValidationError::new("capture.tag_header", "not a valid header name"));
    }
    if let (Ok(key), Ok(tag)) = (key, tag) {
        if key == tag {
            errors.push(ValidationError::new(
                "capture.tag_header",
                "must differ from capture.key_header",
            ));
        }
    }
    if capture.queue_capacity == 0 {
        errors.push(ValidationError::new("capture.queue_capacity", "must be greater than 0"));
    }
    if capture.workers == 0 {
        errors.push(ValidationError::new("capture.workers", "must be greater than 0"));
    }
    if capture.max_attempts == 0 {
        errors.push(ValidationError::new("capture.max_attempts", "must be at least 1"));
    }
    if capture.write_timeout_ms == 0 {
        errors.push(ValidationError::new("capture.write_timeout_ms", "must be greater than 0"));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            "must be 'pretty' or 'json'",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("'{}' is not a socket address", value)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&RecorderConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = RecorderConfig::default();
        config.capture.ttl_secs = 0;
        config.capture.key_header = "bad header".into();
        config.store.address = "localhost:6379".into();
        config.proxy.bind_address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"capture.ttl_secs"));
        assert!(fields.contains(&"capture.key_header"));
        assert!(fields.contains(&"store.address"));
        assert!(fields.contains(&"proxy.bind_address"));
    }

    #[test]
    fn tag_header_must_differ_from_key_header() {
        let mut config = RecorderConfig::default();
        config.capture.tag_header = "x-tid".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "capture.tag_header");
    }
}
