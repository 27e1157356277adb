//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and formats.
//! All problems are collected so an operator sees every mistake at once.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::NatterConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Upper bound for durations expressed in seconds: one year.
const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// A single semantic problem in a configuration.
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

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &NatterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let session = &config.session;
    if session.ttl_secs == 0 {
        errors.push(ValidationError::new("session.ttl_secs", "must be greater than zero"));
    } else if session.ttl_secs > MAX_DURATION_SECS {
        errors.push(ValidationError::new(
            "session.ttl_secs",
            format!("must be at most {MAX_DURATION_SECS}"),
        ));
    }
    if session.purge_interval_secs == 0 {
        errors.push(ValidationError::new("session.purge_interval_secs", "must be greater than zero"));
    }
    if !is_cookie_name(&session.cookie_name) {
        errors.push(ValidationError::new(
            "session.cookie_name",
            "must be non-empty and contain only letters, digits, '-' or '_'",
        ));
    }

    let rate = &config.rate_limit;
    if !(rate.permits_per_second.is_finite() && rate.permits_per_second > 0.0) {
        errors.push(ValidationError::new(
            "rate_limit.permits_per_second",
            "must be a positive number",
        ));
    }
    if rate.burst_size == 0 {
        errors.push(ValidationError::new("rate_limit.burst_size", "must be at least 1"));
    }
    if rate.retry_after_secs == 0 {
        errors.push(ValidationError::new("rate_limit.retry_after_secs", "must be at least 1"));
    }

    if config.audit.read_window_secs > MAX_DURATION_SECS {
        errors.push(ValidationError::new(
            "audit.read_window_secs",
            format!("must be at most {MAX_DURATION_SECS}"),
        ));
    }

    if let Some(path) = &config.audit.file_path {
        if path.trim().is_empty() {
            errors.push(ValidationError::new("audit.file_path", "must not be blank"));
        }
    }

    let limits = &config.limits;
    if limits.max_body_bytes == 0 {
        errors.push(ValidationError::new("limits.max_body_bytes", "must be greater than zero"));
    }
    if limits.max_space_name_len == 0 {
        errors.push(ValidationError::new("limits.max_space_name_len", "must be greater than zero"));
    }
    if limits.max_message_len == 0 {
        errors.push(ValidationError::new("limits.max_message_len", "must be greater than zero"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than zero"));
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("must be one of {}", LOG_LEVELS.join(", ")),
        ));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&NatterConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = NatterConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.session.ttl_secs = 0;
        config.session.cookie_name = "bad cookie".into();
        config.rate_limit.permits_per_second = f64::NAN;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "session.ttl_secs",
                "session.cookie_name",
                "rate_limit.permits_per_second",
            ]
        );
    }

    #[test]
    fn test_durations_are_bounded() {
        let mut config = NatterConfig::default();
        config.session.ttl_secs = 10_000_000_000_000;
        config.audit.read_window_secs = u64::MAX;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["session.ttl_secs", "audit.read_window_secs"]);
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = NatterConfig::default();
        config.observability.metrics_address = "bogus".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
