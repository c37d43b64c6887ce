//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener and request handling settings.
    pub server: ServerConfig,

    /// Per-client rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Outbound delivery settings.
    pub mailer: MailerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:4000").
    pub bind_address: String,

    /// Deployment environment (development, staging, production).
    pub env: String,

    /// Upper bound on the time spent serving a single request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".to_string(),
            env: "development".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Sustained requests per second per client.
    pub rps: f64,

    /// Burst capacity.
    pub burst: u32,

    /// Idle time after which a client's state is discarded, in seconds.
    pub eviction_window_secs: u64,

    /// Cadence of the stale-client sweep, in seconds.
    pub sweep_interval_secs: u64,
}

impl RateLimitConfig {
    /// Whether a limiter should actually be installed.
    ///
    /// A non-positive rate or an empty burst disables limiting outright.
    pub fn is_active(&self) -> bool {
        self.enabled && self.rps.is_finite() && self.rps > 0.0 && self.burst >= 1
    }

    pub fn eviction_window(&self) -> Duration {
        Duration::from_secs(self.eviction_window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rps: 2.0,
            burst: 4,
            eviction_window_secs: 180,
            sweep_interval_secs: 60,
        }
    }
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Time in-flight requests are given to finish once draining starts.
    pub grace_period_secs: u64,
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 30,
        }
    }
}

/// Strategy used between delivery attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// Same delay after every failed attempt.
    Fixed,
    /// Doubling delay with jitter, capped at `max_backoff_ms`.
    Exponential,
}

/// Outbound delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MailerConfig {
    /// SMTP relay host.
    pub host: String,

    /// SMTP relay port.
    pub port: u16,

    /// LOGIN credentials; an empty username disables authentication.
    pub username: String,

    pub password: String,

    /// Connect and command timeout for a single delivery, in seconds.
    pub timeout_secs: u64,

    /// Sender address stamped on every envelope.
    pub sender: String,

    /// Maximum number of delivery attempts (including the first).
    pub max_attempts: u32,

    /// Delay between attempts in milliseconds.
    pub backoff_ms: u64,

    pub backoff_strategy: BackoffStrategy,

    /// Ceiling for exponential backoff in milliseconds.
    pub max_backoff_ms: u64,
}

impl MailerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25,
            username: String::new(),
            password: String::new(),
            timeout_secs: 5,
            sender: "Greenlight <no-reply@greenlight.example>".to_string(),
            max_attempts: 3,
            backoff_ms: 500,
            backoff_strategy: BackoffStrategy::Fixed,
            max_backoff_ms: 5000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_service() {
        let config = AppConfig::default();
        assert_eq!(config.rate_limit.rps, 2.0);
        assert_eq!(config.rate_limit.burst, 4);
        assert_eq!(config.rate_limit.eviction_window(), Duration::from_secs(180));
        assert_eq!(config.rate_limit.sweep_interval(), Duration::from_secs(60));
        assert_eq!(config.shutdown.grace_period(), Duration::from_secs(30));
        assert_eq!(config.mailer.max_attempts, 3);
        assert_eq!(config.mailer.backoff_ms, 500);
        assert_eq!(config.mailer.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn degenerate_limits_disable_limiter() {
        let mut config = RateLimitConfig::default();
        assert!(config.is_active());

        config.rps = 0.0;
        assert!(!config.is_active());

        config.rps = f64::NAN;
        assert!(!config.is_active());

        config.rps = 2.0;
        config.burst = 0;
        assert!(!config.is_active());

        config.burst = 4;
        config.enabled = false;
        assert!(!config.is_active());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [rate_limit]
            rps = 10.5

            [mailer]
            backoff_strategy = "exponential"
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.rps, 10.5);
        assert_eq!(config.rate_limit.burst, 4);
        assert_eq!(config.mailer.backoff_strategy, BackoffStrategy::Exponential);
        assert_eq!(config.server.bind_address, "0.0.0.0:4000");
    }
}
