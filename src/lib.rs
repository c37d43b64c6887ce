//! Greenlight Gate: admission and lifecycle control for a JSON HTTP API.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod mailer;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::schema::AppConfig;
pub use http::HttpServer;
pub use lifecycle::{Shutdown, ShutdownOrchestrator};
