//! Bounded retries for outbound delivery.
//!
//! # Responsibilities
//! - Run one fallible operation up to `max_attempts` times, sequentially
//! - Wait the backoff between a failure and the next attempt
//! - Return the last failure verbatim once attempts are exhausted

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::config::MailerConfig;
use crate::observability::metrics;
use crate::resilience::backoff::Backoff;

/// Something that can push a payload to a target once.
pub trait Transport: Send + Sync {
    type Payload: ?Sized + Sync;
    type Error: fmt::Display + Send;

    fn deliver(
        &self,
        target: &str,
        payload: &Self::Payload,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Bookkeeping for a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryAttempt {
    /// 1-based attempt number.
    pub number: u32,
    pub max_attempts: u32,
    /// Delay before the next attempt if this one fails.
    pub backoff: Duration,
}

impl DeliveryAttempt {
    pub fn is_last(&self) -> bool {
        self.number >= self.max_attempts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn from_config(config: &MailerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: Backoff::from_config(config),
        }
    }

    fn attempt(&self, number: u32) -> DeliveryAttempt {
        DeliveryAttempt {
            number,
            max_attempts: self.max_attempts.max(1),
            backoff: self.backoff.delay(number),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
        }
    }
}

/// Run `op` under `policy`, returning the first success or the last error.
pub async fn retry<F, Fut, T, E>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut(DeliveryAttempt) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut number = 1;
    loop {
        let attempt = policy.attempt(number);

        match op(attempt).await {
            Ok(value) => {
                metrics::record_delivery_attempt("success");
                return Ok(value);
            }
            Err(e) if attempt.is_last() => {
                metrics::record_delivery_attempt("exhausted");
                tracing::warn!(
                    attempt = attempt.number,
                    max_attempts = attempt.max_attempts,
                    error = %e,
                    "Delivery failed, no attempts left"
                );
                return Err(e);
            }
            Err(e) => {
                metrics::record_delivery_attempt("retry");
                tracing::info!(
                    attempt = attempt.number,
                    max_attempts = attempt.max_attempts,
                    delay = ?attempt.backoff,
                    error = %e,
                    "Delivery attempt failed, retrying"
                );
                tokio::time::sleep(attempt.backoff).await;
                number += 1;
            }
        }
    }
}

/// Wraps a [`Transport`] with the retry policy.
#[derive(Debug, Clone)]
pub struct RetryingSender<T> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryingSender<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Deliver `payload` to `target`, retrying per the policy.
    pub async fn send(&self, target: &str, payload: &T::Payload) -> Result<(), T::Error> {
        let transport = &self.transport;
        retry(&self.policy, |attempt| {
            tracing::debug!(recipient = %target, attempt = attempt.number, "Delivering");
            transport.deliver(target, payload)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    const LATENCY: Duration = Duration::from_millis(10);

    /// Fails the first `failures` deliveries.
    struct FlakyTransport {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyTransport {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    impl Transport for FlakyTransport {
        type Payload = str;
        type Error = String;

        async fn deliver(&self, target: &str, _payload: &str) -> Result<(), String> {
            tokio::time::sleep(LATENCY).await;
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(format!("attempt {} to {} failed", call, target))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt() {
        let sender = RetryingSender::new(FlakyTransport::new(2), RetryPolicy::default());
        let backoff = Duration::from_millis(500);

        let start = Instant::now();
        let result = sender.send("alice@example.com", "hello").await;
        let elapsed = start.elapsed();

        assert!(result.is_ok());
        assert_eq!(sender.transport().calls.load(Ordering::SeqCst), 3);
        assert!(elapsed >= backoff * 2);
        assert!(elapsed <= (backoff + LATENCY) * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_last_error_verbatim() {
        let sender = RetryingSender::new(FlakyTransport::new(u32::MAX), RetryPolicy::default());

        let err = sender.send("bob@example.com", "hello").await.unwrap_err();

        assert_eq!(err, "attempt 3 to bob@example.com failed");
        assert_eq!(sender.transport().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_skips_backoff() {
        let sender = RetryingSender::new(FlakyTransport::new(0), RetryPolicy::default());

        let start = Instant::now();
        sender.send("carol@example.com", "hello").await.unwrap();

        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(sender.transport().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_never_overlap() {
        let in_flight = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 4,
            backoff: Backoff::Fixed(Duration::from_millis(5)),
        };

        let result: Result<(), String> = retry(&policy, |attempt| {
            let in_flight = &in_flight;
            async move {
                assert_eq!(in_flight.fetch_add(1, Ordering::SeqCst), 0);
                tokio::time::sleep(LATENCY).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Err(format!("attempt {}", attempt.number))
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), "attempt 4");
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            backoff: Backoff::Fixed(Duration::ZERO),
        };
        let calls = AtomicU32::new(0);

        let result: Result<(), &str> = retry(&policy, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("nope") }
        })
        .await;

        assert_eq!(result, Err("nope"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
