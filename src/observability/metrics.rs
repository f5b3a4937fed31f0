//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gatekeeper_requests_total` (counter): requests by method, status, route
//! - `gatekeeper_request_duration_seconds` (histogram): latency distribution
//! - `gatekeeper_rejections_total` (counter): gate rejections by route, reason
//! - `gatekeeper_rate_windows` (gauge): tracked identifiers per limiter
//! - `gatekeeper_rate_windows_evicted_total` (counter): windows removed by sweeps

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("route", route.to_string()),
    ];
    counter!("gatekeeper_requests_total", &labels).increment(1);
    histogram!("gatekeeper_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_rejection(route: &str, reason: &'static str) {
    counter!(
        "gatekeeper_rejections_total",
        "route" => route.to_string(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_rate_windows(limiter: &str, tracked: usize, evicted: usize) {
    gauge!("gatekeeper_rate_windows", "limiter" => limiter.to_string()).set(tracked as f64);
    counter!("gatekeeper_rate_windows_evicted_total", "limiter" => limiter.to_string())
        .increment(evicted as u64);
}
