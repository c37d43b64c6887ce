//! Request pipeline middleware.
//!
//! Outermost first: metrics → panic guard → admission (security::rate_limit)
//! → timeout → handlers.

pub mod metrics;
pub mod panic_guard;

pub use metrics::track_metrics;
pub use panic_guard::panic_guard_middleware;
