//! Metrics collection and exposition.
//!
//! # Metrics
//! - `resilience_executions_total` (counter): logical calls by pipeline, result
//! - `resilience_execution_duration_seconds` (histogram): end-to-end latency
//! - `resilience_retries_total` (counter): scheduled retries by pipeline
//! - `resilience_circuit_transitions_total` (counter): transitions by pipeline, state
//! - `resilience_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Prometheus exporter is optional and bound to its own address

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::CircuitState;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(
            address = %addr,
            error = %e,
            "Failed to install metrics exporter"
        ),
    }
}

/// Record one finished logical call.
pub fn record_execution(pipeline: &str, result: &'static str, elapsed: Duration) {
    ::metrics::counter!(
        "resilience_executions_total",
        "pipeline" => pipeline.to_string(),
        "result" => result
    )
    .increment(1);
    ::metrics::histogram!(
        "resilience_execution_duration_seconds",
        "pipeline" => pipeline.to_string()
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_retry(pipeline: &str) {
    ::metrics::counter!("resilience_retries_total", "pipeline" => pipeline.to_string())
        .increment(1);
}

pub fn record_circuit_transition(pipeline: &str, state: CircuitState) {
    ::metrics::counter!(
        "resilience_circuit_transitions_total",
        "pipeline" => pipeline.to_string(),
        "state" => state.to_string()
    )
    .increment(1);
    ::metrics::gauge!("resilience_circuit_state", "pipeline" => pipeline.to_string())
        .set(state.as_gauge());
}
