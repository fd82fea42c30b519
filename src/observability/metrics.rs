//! Metrics collection and exposition.
//!
//! # Metrics
//! - `malinger_exchanges_total` (counter): finished exchanges by `outcome`
//!   (`released`, `upstream_error`, `upstream_body_error`,
//!   `invalid_target`, `client_aborted`)
//! - `malinger_upstream_latency_seconds` (histogram): request start until the
//!   upstream response was fully buffered
//! - `malinger_hold_seconds` (histogram): time a buffered response waited
//!   for its release instant
//! - `malinger_exchanges_in_flight` (gauge)

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics listening");
    Ok(())
}

pub fn record_exchange(outcome: &'static str) {
    metrics::counter!("malinger_exchanges_total", "outcome" => outcome).increment(1);
}

pub fn record_upstream_latency(latency: Duration) {
    metrics::histogram!("malinger_upstream_latency_seconds").record(latency.as_secs_f64());
}

pub fn record_hold(held: Duration) {
    metrics::histogram!("malinger_hold_seconds").record(held.as_secs_f64());
}

pub fn set_in_flight(active: u64) {
    metrics::gauge!("malinger_exchanges_in_flight").set(active as f64);
}
