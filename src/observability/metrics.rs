//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_received_total` (counter)
//! - `http_responses_sent_total` (counter): by method, status
//! - `http_request_duration_seconds` (histogram)
//! - `rate_limited_requests_total` (counter)
//! - `rate_limit_tracked_clients` (gauge)
//! - `panics_recovered_total` (counter): by stage (handler, body)
//! - `delivery_attempts_total` (counter): by outcome
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so tests need no setup
//! - Prometheus exporter only when `metrics_enabled`

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request_received() {
    counter!("http_requests_received_total").increment(1);
}

pub fn record_response_sent(method: &str, status: u16, start: Instant) {
    counter!(
        "http_responses_sent_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("http_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("rate_limited_requests_total").increment(1);
}

pub fn record_tracked_clients(count: usize) {
    gauge!("rate_limit_tracked_clients").set(count as f64);
}

pub fn record_panic(stage: &'static str) {
    counter!("panics_recovered_total", "stage" => stage).increment(1);
}

pub fn record_delivery_attempt(outcome: &'static str) {
    counter!("delivery_attempts_total", "outcome" => outcome).increment(1);
}
