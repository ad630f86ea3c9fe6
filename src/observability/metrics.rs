//! Metrics collection and exposition.
//!
//! # Metrics
//! - `recorder_captures_total` (counter): snapshots queued, by phase
//! - `recorder_capture_skipped_total` (counter): captures skipped, by reason
//! - `recorder_store_writes_total` (counter): store writes by op and outcome
//! - `recorder_store_write_duration_seconds` (histogram): write latency incl. retries
//! - `recorder_write_queue_depth` (gauge): writes queued or in flight
//! - `recorder_store_pool_connections` (gauge): Redis pool connections, open and idle
//! - `recorder_queries_total` (counter): query API calls by route and status
//! - `recorder_proxy_requests_total` (counter): proxied requests by method and status
//! - `recorder_proxy_request_duration_seconds` (histogram): proxy round-trip latency
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_capture(phase: &'static str) {
    counter!("recorder_captures_total", "phase" => phase).increment(1);
}

pub fn record_capture_skipped(reason: &'static str) {
    counter!("recorder_capture_skipped_total", "reason" => reason).increment(1);
}

pub fn record_store_write(op: &'static str, outcome: &'static str, started: Option<Instant>) {
    counter!("recorder_store_writes_total", "op" => op, "outcome" => outcome).increment(1);
    if let Some(started) = started {
        histogram!("recorder_store_write_duration_seconds", "op" => op)
            .record(started.elapsed().as_secs_f64());
    }
}

pub fn record_queue_depth(depth: usize) {
    gauge!("recorder_write_queue_depth").set(depth as f64);
}

pub fn record_store_pool(size: usize, available: usize) {
    gauge!("recorder_store_pool_connections", "state" => "open").set(size as f64);
    gauge!("recorder_store_pool_connections", "state" => "idle").set(available as f64);
}

pub fn record_query(route: &'static str, status: u16) {
    counter!("recorder_queries_total", "route" => route, "status" => status.to_string()).increment(1);
}

pub fn record_proxy_request(method: &str, status: u16, started: Instant) {
    counter!(
        "recorder_proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("recorder_proxy_request_duration_seconds").record(started.elapsed().as_secs_f64());
}
