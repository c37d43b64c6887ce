//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter when enabled
//! - Configure the SMTP relay and hand the mailer to downstream routes
//! - Register signal handlers before accepting traffic
//! - Bind the listener and run the server to completion
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::io;
use std::sync::Arc;

use axum::{Extension, Router};
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::http::HttpServer;
use crate::lifecycle::{ShutdownError, SignalListener};
use crate::mailer::{SmtpError, SmtpMailer};
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to register signal handlers: {0}")]
    Signal(#[source] io::Error),

    #[error("failed to configure mailer: {0}")]
    Mailer(#[from] SmtpError),

    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

/// Bring the gateway up in front of `routes` and block until it stops.
///
/// Handlers in `routes` can extract `Extension<Arc<SmtpMailer>>`.
pub async fn start(config: AppConfig, routes: Router) -> Result<(), StartupError> {
    tracing::info!(
        bind_address = %config.server.bind_address,
        env = %config.server.env,
        grace_period_secs = config.shutdown.grace_period_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mailer = Arc::new(SmtpMailer::from_config(&config.mailer)?);
    let routes = routes.layer(Extension(mailer));

    let signals = SignalListener::install().map_err(StartupError::Signal)?;

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.server.bind_address.clone(),
            source,
        })?;

    let server = HttpServer::new(config, routes);
    server.run(listener, signals.recv()).await?;

    Ok(())
}
