//! Background eviction of idle rate-limit clients.
//!
//! # Responsibilities
//! - Periodically evict clients idle past the eviction window
//! - Stop when the lifecycle reaches `Stopped`

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::lifecycle::ShutdownSignal;
use crate::security::rate_limit::ClientRegistry;

/// Shortest cadence the sweeper accepts.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

pub struct Sweeper {
    registry: Arc<ClientRegistry>,
    interval: Duration,
}

impl Sweeper {
    /// An `interval` below [`MIN_SWEEP_INTERVAL`] is raised to it.
    pub fn new(registry: Arc<ClientRegistry>, interval: Duration) -> Self {
        let interval = if interval < MIN_SWEEP_INTERVAL {
            tracing::warn!(
                requested = ?interval,
                using = ?MIN_SWEEP_INTERVAL,
                "Sweep interval too short, clamping"
            );
            MIN_SWEEP_INTERVAL
        } else {
            interval
        };
        Self { registry, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start sweeping on a background task.
    pub fn spawn(self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: ShutdownSignal) {
        tracing::info!(
            interval = ?self.interval,
            eviction_window = ?self.registry.settings().eviction_window,
            "Client sweeper starting"
        );

        // First sweep one full interval after start, not immediately.
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.registry.sweep();
                    if evicted > 0 {
                        tracing::debug!(evicted, remaining = self.registry.len(), "Evicted idle clients");
                    }
                }
                _ = shutdown.stopped() => {
                    tracing::info!("Client sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::security::rate_limit::RateLimitSettings;

    fn registry() -> Arc<ClientRegistry> {
        Arc::new(ClientRegistry::new(RateLimitSettings {
            rps: 1.0,
            burst: 1,
            eviction_window: Duration::from_secs(180),
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn evicts_on_cadence_and_stops_with_lifecycle() {
        let registry = registry();
        let shutdown = Shutdown::new();
        let handle = Sweeper::new(Arc::clone(&registry), Duration::from_secs(60))
            .spawn(shutdown.subscribe());

        registry.admit("198.51.100.1");

        // Sweeps at 60s, 120s and 180s keep the client.
        time::sleep(Duration::from_secs(170)).await;
        assert!(registry.contains("198.51.100.1"));

        // The 240s sweep is past the window.
        time::sleep(Duration::from_secs(80)).await;
        assert!(registry.is_empty());

        shutdown.finish();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_clamped_and_still_sweeps() {
        let registry = Arc::new(ClientRegistry::new(RateLimitSettings {
            rps: 1.0,
            burst: 1,
            eviction_window: Duration::from_secs(5),
        }));
        let shutdown = Shutdown::new();
        let sweeper = Sweeper::new(Arc::clone(&registry), Duration::ZERO);
        assert_eq!(sweeper.interval(), MIN_SWEEP_INTERVAL);
        let handle = sweeper.spawn(shutdown.subscribe());

        registry.admit("198.51.100.7");
        time::sleep(Duration::from_secs(7)).await;
        assert!(registry.is_empty());

        shutdown.finish();
        // A panicking task would surface as a JoinError here.
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn draining_does_not_stop_sweeper() {
        let registry = registry();
        let shutdown = Shutdown::new();
        let handle = Sweeper::new(Arc::clone(&registry), Duration::from_secs(60))
            .spawn(shutdown.subscribe());

        shutdown.begin_draining();
        time::sleep(Duration::from_secs(1)).await;
        assert!(!handle.is_finished());

        shutdown.finish();
        handle.await.unwrap();
    }
}
