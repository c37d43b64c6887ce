//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_ip.rs (resolve best-effort client identity)
//!     → rate_limit.rs (per-client token bucket admission)
//!     → Pass to handlers
//!
//! Background:
//!     sweeper.rs evicts idle clients on a fixed cadence
//! ```
//!
//! # Design Decisions
//! - One lock guards every bucket and the map itself
//! - Disabled limiting installs no middleware at all
//! - No trust in client input beyond picking a partition key

pub mod client_ip;
pub mod rate_limit;
pub mod sweeper;

pub use rate_limit::{ClientRegistry, RateLimitSettings, TokenBucket};
pub use sweeper::Sweeper;
