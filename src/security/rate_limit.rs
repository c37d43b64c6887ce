//! Per-client rate limiting middleware.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::http::response;
use crate::observability::metrics;
use crate::security::client_ip::resolve_client_ip;

/// A simple token bucket rate limiter.
///
/// Not synchronized on its own; callers hold the registry lock.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(capacity: u32, refill_rate: f64, now: Instant) -> Self {
        Self {
            capacity: capacity as f64,
            refill_rate,
            tokens: capacity as f64,
            last_refill: now,
        }
    }

    pub fn try_consume(&mut self) -> bool {
        self.try_consume_at(Instant::now())
    }

    /// Refill for the time elapsed since the last call, then take one token.
    pub fn try_consume_at(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();

        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently held, as of the last refill.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }
}

#[derive(Debug)]
struct ClientEntry {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// Validated limiter settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitSettings {
    pub rps: f64,
    pub burst: u32,
    pub eviction_window: Duration,
}

impl RateLimitSettings {
    /// Returns `None` when limiting is disabled or the limits are degenerate.
    pub fn from_config(config: &RateLimitConfig) -> Option<Self> {
        if !config.is_active() {
            return None;
        }

        Some(Self {
            rps: config.rps,
            burst: config.burst,
            eviction_window: config.eviction_window(),
        })
    }
}

/// Per-client token buckets behind a single lock.
///
/// Admission and eviction share the lock, so every mutation of the map or of
/// a bucket is totally ordered.
#[derive(Debug)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<String, ClientEntry>>,
    settings: RateLimitSettings,
}

impl ClientRegistry {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            settings,
        }
    }

    /// Build a registry from config, or `None` if limiting is off.
    pub fn from_config(config: &RateLimitConfig) -> Option<Self> {
        RateLimitSettings::from_config(config).map(Self::new)
    }

    pub fn settings(&self) -> RateLimitSettings {
        self.settings
    }

    /// Decide whether a request from `client` may proceed.
    pub fn admit(&self, client: &str) -> bool {
        self.admit_at(client, Instant::now())
    }

    pub fn admit_at(&self, client: &str, now: Instant) -> bool {
        let mut clients = self.lock();

        let settings = self.settings;
        let entry = clients
            .entry(client.to_string())
            .or_insert_with(|| ClientEntry {
                bucket: TokenBucket::new(settings.burst, settings.rps, now),
                last_seen: now,
            });

        entry.last_seen = now;
        entry.bucket.try_consume_at(now)
    }

    /// Evict clients idle for longer than the eviction window.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut clients = self.lock();
        let before = clients.len();

        let window = self.settings.eviction_window;
        clients.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= window);

        let evicted = before - clients.len();
        metrics::record_tracked_clients(clients.len());
        evicted
    }

    /// Number of clients currently tracked.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, client: &str) -> bool {
        self.lock().contains_key(client)
    }

    // A panic while holding the lock cannot leave a bucket half-updated in a
    // way that matters, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, ClientEntry>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Middleware function for per-client rate limiting.
///
/// Only installed when limiting is enabled; a disabled limiter has no layer
/// at all.
pub async fn rate_limit_middleware(
    State(registry): State<Arc<ClientRegistry>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = resolve_client_ip(&request);

    if registry.admit(&client) {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, "Rate limit exceeded");
        metrics::record_rate_limited();
        response::rate_limit_exceeded()
    }
}
