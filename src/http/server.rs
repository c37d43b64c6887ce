//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the downstream routes with the admission pipeline
//! - Wire up middleware (tracing, request ID, metrics, panic guard,
//!   rate limiting, timeout)
//! - Start the client sweeper alongside the server
//! - Hand the router to the shutdown orchestrator

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Extension, Router};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::http::healthcheck::healthcheck_handler;
use crate::http::middleware::{panic_guard_middleware, track_metrics};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::{Shutdown, ShutdownError, ShutdownOrchestrator, ShutdownSignal, TerminationSignal};
use crate::security::rate_limit::{rate_limit_middleware, ClientRegistry};
use crate::security::sweeper::Sweeper;

/// HTTP front door.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
    registry: Option<Arc<ClientRegistry>>,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Create a server that fronts `routes` with the admission pipeline.
    pub fn new(config: AppConfig, routes: Router) -> Self {
        let registry = ClientRegistry::from_config(&config.rate_limit).map(Arc::new);

        match &registry {
            Some(r) => tracing::info!(
                rps = r.settings().rps,
                burst = r.settings().burst,
                "Rate limiting enabled"
            ),
            None if config.rate_limit.enabled => tracing::warn!(
                rps = config.rate_limit.rps,
                burst = config.rate_limit.burst,
                "Rate limiting disabled: rps and burst must both be positive"
            ),
            None => tracing::info!("Rate limiting disabled"),
        }

        let shutdown = Shutdown::new();
        let router = Self::build_router(&config, routes, registry.clone(), shutdown.subscribe());

        Self {
            router,
            config,
            registry,
            shutdown,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers added last run first.
    #[allow(deprecated)]
    fn build_router(
        config: &AppConfig,
        routes: Router,
        registry: Option<Arc<ClientRegistry>>,
        signal: ShutdownSignal,
    ) -> Router {
        let health = Router::new()
            .route("/v1/healthcheck", get(healthcheck_handler))
            .with_state(config.server.env.clone());

        let mut router = routes
            .merge(health)
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)));

        // A disabled limiter contributes no layer at all.
        if let Some(registry) = registry {
            router = router.layer(middleware::from_fn_with_state(registry, rate_limit_middleware));
        }

        router
            .layer(middleware::from_fn(panic_guard_middleware))
            .layer(middleware::from_fn(track_metrics))
            .layer(Extension(signal))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run until `trigger` fires and in-flight requests drain.
    pub async fn run<T>(self, listener: TcpListener, trigger: T) -> Result<(), ShutdownError>
    where
        T: Future<Output = TerminationSignal> + Send + 'static,
    {
        let sweeper = self.registry.as_ref().map(|registry| {
            Sweeper::new(Arc::clone(registry), self.config.rate_limit.sweep_interval())
                .spawn(self.shutdown.subscribe())
        });

        let orchestrator =
            ShutdownOrchestrator::new(self.shutdown.clone(), self.config.shutdown.grace_period());
        let result = orchestrator.run(listener, self.router, trigger).await;

        self.shutdown.finish();
        if let Some(handle) = sweeper {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Client sweeper ended abnormally");
            }
        }

        result
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The client registry, if rate limiting is active.
    pub fn registry(&self) -> Option<Arc<ClientRegistry>> {
        self.registry.clone()
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
