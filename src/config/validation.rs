//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - A degenerate rate limit is not an error; it disables the limiter

use std::net::SocketAddr;

use lettre::message::Mailbox;

use crate::config::schema::{AppConfig, BackoffStrategy};

const KNOWN_ENVIRONMENTS: &[&str] = &["development", "staging", "production"];

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid {field} '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("unknown environment '{0}' (expected development, staging or production)")]
    UnknownEnvironment(String),

    #[error("mailer.max_backoff_ms ({max}) is lower than mailer.backoff_ms ({base})")]
    BackoffCeiling { base: u64, max: u64 },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "server.bind_address",
            value: config.server.bind_address.clone(),
        });
    }

    if !KNOWN_ENVIRONMENTS.contains(&config.server.env.as_str()) {
        errors.push(ValidationError::UnknownEnvironment(config.server.env.clone()));
    }

    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("server.request_timeout_secs"));
    }

    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::Zero("rate_limit.sweep_interval_secs"));
    }

    if config.rate_limit.eviction_window_secs == 0 {
        errors.push(ValidationError::Zero("rate_limit.eviction_window_secs"));
    }

    if config.shutdown.grace_period_secs == 0 {
        errors.push(ValidationError::Zero("shutdown.grace_period_secs"));
    }

    if config.mailer.host.trim().is_empty() {
        errors.push(ValidationError::InvalidAddress {
            field: "mailer.host",
            value: config.mailer.host.clone(),
        });
    }

    if config.mailer.port == 0 {
        errors.push(ValidationError::Zero("mailer.port"));
    }

    if config.mailer.timeout_secs == 0 {
        errors.push(ValidationError::Zero("mailer.timeout_secs"));
    }

    if config.mailer.sender.parse::<Mailbox>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "mailer.sender",
            value: config.mailer.sender.clone(),
        });
    }

    if config.mailer.max_attempts == 0 {
        errors.push(ValidationError::Zero("mailer.max_attempts"));
    }

    if config.mailer.backoff_strategy == BackoffStrategy::Exponential
        && config.mailer.max_backoff_ms < config.mailer.backoff_ms
    {
        errors.push(ValidationError::BackoffCeiling {
            base: config.mailer.backoff_ms,
            max: config.mailer.max_backoff_ms,
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = AppConfig::default();
        config.server.bind_address = "not-an-address".into();
        config.shutdown.grace_period_secs = 0;
        config.rate_limit.sweep_interval_secs = 0;
        config.mailer.max_attempts = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero("shutdown.grace_period_secs")));
        assert!(errors.contains(&ValidationError::Zero("mailer.max_attempts")));
    }

    #[test]
    fn rejects_unusable_relay_settings() {
        let mut config = AppConfig::default();
        config.mailer.host = " ".into();
        config.mailer.port = 0;
        config.mailer.timeout_secs = 0;
        config.mailer.sender = "not-an-email".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero("mailer.port")));
        assert!(errors.contains(&ValidationError::Zero("mailer.timeout_secs")));
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::InvalidAddress { field: "mailer.sender", .. }
        )));
    }

    #[test]
    fn zero_rate_is_not_a_validation_error() {
        let mut config = AppConfig::default();
        config.rate_limit.rps = 0.0;
        config.rate_limit.burst = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn exponential_backoff_needs_sane_ceiling() {
        let mut config = AppConfig::default();
        config.mailer.backoff_strategy = BackoffStrategy::Exponential;
        config.mailer.backoff_ms = 1000;
        config.mailer.max_backoff_ms = 10;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::BackoffCeiling { base: 1000, max: 10 }]
        );
    }

    #[test]
    fn rejects_unknown_environment() {
        let mut config = AppConfig::default();
        config.server.env = "qa".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::UnknownEnvironment("qa".into())]);
    }
}
