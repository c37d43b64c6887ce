//! Shutdown coordination and orchestration.
//!
//! ```text
//! Running --(SIGINT | SIGTERM)--> Draining --(drained | deadline)--> Stopped
//! ```

use std::future::{Future, IntoFuture};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};

use crate::lifecycle::signals::TerminationSignal;

/// Process-wide lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    /// Accepting connections normally.
    Running,
    /// No new connections; in-flight requests are finishing.
    Draining,
    /// Server loop is gone.
    Stopped,
}

/// Errors surfaced by the orchestrator. Each one maps to a non-zero exit.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("listener failed: {0}")]
    Listener(#[source] io::Error),

    #[error("listener closed without a shutdown being initiated")]
    ListenerClosed,

    #[error("in-flight requests did not drain within {grace:?}")]
    DrainTimeout { grace: Duration },

    #[error("shutdown watcher exited without reporting a result")]
    WatcherLost,
}

/// Coordinator for graceful shutdown.
///
/// Owns the lifecycle state; every long-running task observes it through a
/// [`ShutdownSignal`].
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<ShutdownState>>,
}

impl Shutdown {
    /// Create a new coordinator in the `Running` state.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ShutdownState::Running);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to lifecycle changes.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn state(&self) -> ShutdownState {
        *self.tx.borrow()
    }

    /// Move from `Running` to `Draining`.
    ///
    /// Returns `false` if draining had already begun.
    pub fn begin_draining(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == ShutdownState::Running {
                *state = ShutdownState::Draining;
                true
            } else {
                false
            }
        })
    }

    /// Mark the lifecycle as finished.
    pub fn finish(&self) {
        self.tx.send_if_modified(|state| {
            if *state == ShutdownState::Stopped {
                false
            } else {
                *state = ShutdownState::Stopped;
                true
            }
        });
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of the lifecycle state.
///
/// Inserted into every request's extensions, so handlers can cut long work
/// short once draining begins.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<ShutdownState>,
}

impl ShutdownSignal {
    pub fn state(&self) -> ShutdownState {
        *self.rx.borrow()
    }

    pub fn is_draining(&self) -> bool {
        self.state() != ShutdownState::Running
    }

    /// Resolves once the lifecycle has left `Running`.
    pub async fn draining(&mut self) {
        let _ = self.rx.wait_for(|s| *s != ShutdownState::Running).await;
    }

    /// Resolves once the lifecycle reaches `Stopped`.
    pub async fn stopped(&mut self) {
        let _ = self.rx.wait_for(|s| *s == ShutdownState::Stopped).await;
    }
}

/// Supervises the serve loop and the signal watcher.
///
/// The watcher and the serve loop run concurrently. The watcher reports the
/// drain outcome through a single-slot channel, and the orchestrator never
/// returns before that outcome (or a fatal serve error) is in hand.
#[derive(Debug)]
pub struct ShutdownOrchestrator {
    shutdown: Shutdown,
    grace_period: Duration,
}

impl ShutdownOrchestrator {
    pub fn new(shutdown: Shutdown, grace_period: Duration) -> Self {
        Self {
            shutdown,
            grace_period,
        }
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Serve `app` on `listener` until `trigger` fires and the drain settles.
    pub async fn run<T>(self, listener: TcpListener, app: Router, trigger: T) -> Result<(), ShutdownError>
    where
        T: Future<Output = TerminationSignal> + Send + 'static,
    {
        let addr = listener.local_addr().map_err(ShutdownError::Listener)?;
        tracing::info!(address = %addr, "starting server");

        let mut draining = self.shutdown.subscribe();
        let serve = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { draining.draining().await })
        .into_future();

        self.supervise(serve, trigger).await?;

        tracing::info!(address = %addr, "stopped server");
        Ok(())
    }

    /// Drive `serve` to completion while watching `trigger`.
    ///
    /// `serve` must stop accepting and wind down once the lifecycle leaves
    /// `Running`. Returning from `serve` before that is a listener failure.
    pub async fn supervise<S, T>(&self, serve: S, trigger: T) -> Result<(), ShutdownError>
    where
        S: Future<Output = io::Result<()>>,
        T: Future<Output = TerminationSignal> + Send + 'static,
    {
        let (drained_tx, drained_rx) = oneshot::channel::<()>();
        let (result_tx, mut result_rx) = oneshot::channel::<Result<(), ShutdownError>>();

        let shutdown = self.shutdown.clone();
        let grace = self.grace_period;
        let watcher = tokio::spawn(async move {
            let signal = trigger.await;
            tracing::info!(signal = %signal, "caught signal");

            shutdown.begin_draining();
            tracing::info!(grace_period = ?grace, "Draining in-flight requests");

            let result = match tokio::time::timeout(grace, drained_rx).await {
                Ok(_) => Ok(()),
                Err(_) => Err(ShutdownError::DrainTimeout { grace }),
            };
            let _ = result_tx.send(result);
        });

        tokio::pin!(serve);

        let served = tokio::select! {
            served = &mut serve => served,
            handed = &mut result_rx => {
                // The watcher only reports ahead of the serve loop when the
                // deadline passed; whatever is still running is abandoned.
                self.shutdown.finish();
                let result = handed.unwrap_or(Err(ShutdownError::WatcherLost));
                if let Err(e) = &result {
                    tracing::error!(error = %e, "Graceful shutdown failed");
                }
                return result;
            }
        };

        let draining = self.shutdown.state() == ShutdownState::Draining;
        match served {
            Err(e) => {
                watcher.abort();
                self.shutdown.finish();
                tracing::error!(error = %e, "Listener failed");
                Err(ShutdownError::Listener(e))
            }
            Ok(()) if !draining => {
                watcher.abort();
                self.shutdown.finish();
                tracing::error!("Listener closed unexpectedly");
                Err(ShutdownError::ListenerClosed)
            }
            Ok(()) => {
                let _ = drained_tx.send(());
                let result = result_rx.await.unwrap_or(Err(ShutdownError::WatcherLost));
                self.shutdown.finish();
                if let Err(e) = &result {
                    tracing::error!(error = %e, "Graceful shutdown failed");
                }
                result
            }
        }
    }
}
