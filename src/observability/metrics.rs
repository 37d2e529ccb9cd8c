//! Metrics collection and exposition.
//!
//! # Metrics
//! - `orchestrator_requests_total` (counter): requests by endpoint, status
//! - `orchestrator_request_duration_seconds` (histogram): latency by endpoint
//! - `orchestrator_upstream_attempts_total` (counter): upstream attempts by target, outcome
//!
//! Without an installed recorder every call is a no-op, so tests need no setup.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished generation request.
pub fn record_request(endpoint: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "orchestrator_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("orchestrator_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

/// Record one upstream attempt outcome.
pub fn record_upstream_attempt(target: &'static str, outcome: &'static str) {
    metrics::counter!(
        "orchestrator_upstream_attempts_total",
        "target" => target,
        "outcome" => outcome
    )
    .increment(1);
}
