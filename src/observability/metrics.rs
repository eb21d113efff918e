//! Metrics collection and exposition.
//!
//! # Metrics
//! - `asset_proxy_rewrites_total` (counter): rewritten bodies by kind
//! - `asset_proxy_passthrough_total` (counter): untouched bodies by reason
//! - `asset_proxy_sprites_inlined_total` (counter): sprite files inlined
//! - `asset_proxy_sprite_failures_total` (counter): sprite references skipped
//! - `asset_proxy_origin_requests_total` (counter): origin responses by status
//! - `asset_proxy_origin_duration_seconds` (histogram): origin latency
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels are static strings, no per-URL cardinality

use std::net::SocketAddr;
use std::time::Instant;

use ::metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_rewrite(kind: &'static str) {
    counter!("asset_proxy_rewrites_total", "kind" => kind).increment(1);
}

pub fn record_passthrough(reason: &'static str) {
    counter!("asset_proxy_passthrough_total", "reason" => reason).increment(1);
}

pub fn record_sprites_inlined(count: usize) {
    if count > 0 {
        counter!("asset_proxy_sprites_inlined_total").increment(count as u64);
    }
}

pub fn record_sprite_failure(kind: &'static str) {
    counter!("asset_proxy_sprite_failures_total", "kind" => kind).increment(1);
}

pub fn record_origin_request(status: u16, started: Instant) {
    counter!("asset_proxy_origin_requests_total", "status" => status.to_string()).increment(1);
    histogram!("asset_proxy_origin_duration_seconds").record(started.elapsed().as_secs_f64());
}
