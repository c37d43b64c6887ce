//! Delay between delivery attempts.

use std::time::Duration;

use rand::Rng;

use crate::config::{BackoffStrategy, MailerConfig};

/// Delay policy applied after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay every time.
    Fixed(Duration),
    /// Doubling delay with up to 10% jitter, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    pub fn from_config(config: &MailerConfig) -> Self {
        let base = Duration::from_millis(config.backoff_ms);
        match config.backoff_strategy {
            BackoffStrategy::Fixed => Backoff::Fixed(base),
            BackoffStrategy::Exponential => Backoff::Exponential {
                base,
                max: Duration::from_millis(config.max_backoff_ms),
            },
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => calculate_backoff(attempt, base, max),
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Fixed(Duration::from_millis(500))
    }
}

/// Delay after failed attempt `attempt` for a doubling schedule.
///
/// `base * 2^(attempt - 1)`, capped at `max`, plus up to 10% jitter.
/// Attempt zero never waits.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u32.saturating_pow(attempt - 1);
    let capped = base.saturating_mul(factor).min(max);
    let jitter = capped.mul_f64(rand::thread_rng().gen_range(0.0..0.1));

    capped + jitter
}

#[cfg(test)]
mod tests {
    use super::*;

    fn within_jitter(delay: Duration, expected_ms: u64) -> bool {
        let expected = Duration::from_millis(expected_ms);
        delay >= expected && delay < expected + expected / 10
    }

    #[test]
    fn exponential_doubles_then_caps() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_millis(1000),
        };

        assert!(within_jitter(backoff.delay(1), 100));
        assert!(within_jitter(backoff.delay(2), 200));
        assert!(within_jitter(backoff.delay(4), 800));
        assert!(within_jitter(backoff.delay(5), 1000));
        assert!(within_jitter(backoff.delay(40), 1000));
    }

    #[test]
    fn attempt_zero_never_waits() {
        let delay = calculate_backoff(0, Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(delay, Duration::ZERO);
    }

    #[test]
    fn sub_millisecond_base_keeps_precision() {
        let delay = calculate_backoff(3, Duration::from_micros(250), Duration::from_secs(1));
        assert!(delay >= Duration::from_micros(1000) && delay < Duration::from_micros(1100));
    }

    #[test]
    fn fixed_backoff_ignores_attempt() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay(1), Duration::from_millis(500));
        assert_eq!(backoff.delay(7), Duration::from_millis(500));
    }

    #[test]
    fn strategy_follows_config() {
        let mut config = MailerConfig::default();
        assert_eq!(Backoff::from_config(&config), Backoff::Fixed(Duration::from_millis(500)));

        config.backoff_strategy = BackoffStrategy::Exponential;
        config.max_backoff_ms = 2000;
        assert_eq!(
            Backoff::from_config(&config),
            Backoff::Exponential {
                base: Duration::from_millis(500),
                max: Duration::from_millis(2000),
            }
        );
    }
}
