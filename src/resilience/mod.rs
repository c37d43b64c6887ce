//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound delivery:
//!     → retries.rs (attempt, on failure wait and try again)
//!     → backoff.rs (fixed or jittered exponential delay)
//! ```
//!
//! # Design Decisions
//! - Attempts are strictly sequential
//! - Exhaustion returns the last error untouched; the caller decides
//!   whether it is fatal

pub mod backoff;
pub mod retries;

pub use backoff::Backoff;
pub use retries::{retry, DeliveryAttempt, RetryPolicy, RetryingSender, Transport};
