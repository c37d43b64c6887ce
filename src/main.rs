//! Greenlight Gate
//!
//! Front door for a JSON HTTP API built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌───────────────────────────────────────────────────┐
//!                       │                  GREENLIGHT GATE                  │
//!                       │                                                   │
//!   Client Request      │  ┌──────────┐   ┌────────────┐   ┌────────────┐   │
//!   ────────────────────┼─▶│  panic   │──▶│ admission  │──▶│ downstream │   │
//!                       │  │  guard   │   │ (rate lim.)│   │  handlers  │   │
//!                       │  └──────────┘   └─────┬──────┘   └─────┬──────┘   │
//!                       │                       │                │          │
//!                       │                ┌──────▼──────┐  ┌──────▼───────┐  │
//!                       │                │   client    │  │  retrying    │──┼──▶ Mail
//!                       │                │  registry   │  │   sender     │  │    relay
//!                       │                │  + sweeper  │  └──────────────┘  │
//!                       │                └─────────────┘                    │
//!                       │                                                   │
//!   SIGINT / SIGTERM    │  ┌─────────────────────────────────────────────┐  │
//!   ────────────────────┼─▶│  shutdown orchestrator (run → drain → stop) │  │
//!                       │  └─────────────────────────────────────────────┘  │
//!                       └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use axum::Router;
use clap::Parser;

use greenlight_gate::config::{load_config, validation::validate_config, AppConfig, ConfigError};
use greenlight_gate::lifecycle::startup;
use greenlight_gate::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "greenlight-gate")]
#[command(about = "Admission and lifecycle front door for a JSON HTTP API", version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP server port (overrides the port of server.bind_address)
    #[arg(long)]
    port: Option<u16>,

    /// Environment (development, staging, production)
    #[arg(long)]
    env: Option<String>,

    /// Rate limiter maximum requests per second
    #[arg(long)]
    limiter_rps: Option<f64>,

    /// Rate limiter maximum burst
    #[arg(long)]
    limiter_burst: Option<u32>,

    /// Enable rate limiter
    #[arg(long)]
    limiter_enabled: Option<bool>,

    /// SMTP host
    #[arg(long)]
    smtp_host: Option<String>,

    /// SMTP port
    #[arg(long)]
    smtp_port: Option<u16>,

    /// SMTP username
    #[arg(long)]
    smtp_username: Option<String>,

    /// SMTP password
    #[arg(long, env = "GREENLIGHT_SMTP_PASSWORD", hide_env_values = true)]
    smtp_password: Option<String>,

    /// SMTP sender
    #[arg(long)]
    smtp_sender: Option<String>,
}

impl Cli {
    fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => AppConfig::default(),
        };

        if let Some(port) = self.port {
            let host = config
                .server
                .bind_address
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            config.server.bind_address = format!("{}:{}", host, port);
        }
        if let Some(env) = &self.env {
            config.server.env = env.clone();
        }
        if let Some(rps) = self.limiter_rps {
            config.rate_limit.rps = rps;
        }
        if let Some(burst) = self.limiter_burst {
            config.rate_limit.burst = burst;
        }
        if let Some(enabled) = self.limiter_enabled {
            config.rate_limit.enabled = enabled;
        }
        if let Some(host) = &self.smtp_host {
            config.mailer.host = host.clone();
        }
        if let Some(port) = self.smtp_port {
            config.mailer.port = port;
        }
        if let Some(username) = &self.smtp_username {
            config.mailer.username = username.clone();
        }
        if let Some(password) = &self.smtp_password {
            config.mailer.password = password.clone();
        }
        if let Some(sender) = &self.smtp_sender {
            config.mailer.sender = sender.clone();
        }

        // Flags can break a config that was valid on disk.
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load()?;

    logging::init_logging(&config.observability);

    tracing::info!("greenlight-gate v{} starting", env!("CARGO_PKG_VERSION"));

    // Domain routes are mounted by the embedding application; the bare binary
    // serves the healthcheck only.
    if let Err(e) = startup::start(config, Router::new()).await {
        tracing::error!(error = %e, "Server exited with error");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
