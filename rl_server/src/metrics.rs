//! Prometheus metrics for monitoring the referee lights server.
//!
//! Metrics are recorded through the `metrics` facade and are no-ops until an
//! exporter is installed with [`init_metrics`].
//!
//! # Metrics Categories
//!
//! - **WebSocket Metrics**: Active connections, rejected handshakes, messages
//! - **Lift Metrics**: Emitted snapshots by state, validation failures
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use rl_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::websocket_connections_active(3);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// Set current active WebSocket connections count.
pub fn websocket_connections_active(count: usize) {
    metrics::gauge!("websocket_connections_active").set(count as f64);
}

/// Increment total accepted WebSocket connections counter.
pub fn websocket_connections_total() {
    metrics::counter!("websocket_connections_total").increment(1);
}

/// Increment rejected handshakes counter.
pub fn websocket_connections_rejected() {
    metrics::counter!("websocket_connections_rejected_total").increment(1);
}

/// Increment WebSocket messages received counter.
pub fn websocket_messages_received(event: &str) {
    metrics::counter!("websocket_messages_received",
        "event" => event.to_string()
    )
    .increment(1);
}

/// Increment WebSocket messages sent counter.
pub fn websocket_messages_sent() {
    metrics::counter!("websocket_messages_sent").increment(1);
}

// ============================================================================
// Lift Metrics
// ============================================================================

/// Increment validation failures counter.
pub fn validation_failures_total(kind: &str) {
    metrics::counter!("validation_failures_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Increment emitted snapshots counter, labelled by state.
///
/// Counts every notification, including events that changed nothing.
pub fn lift_snapshots_total(state: &str) {
    metrics::counter!("lift_snapshots_total",
        "state" => state.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lift_metrics_without_exporter() {
        // Recording is a no-op until an exporter is installed
        lift_snapshots_total("readyToReveal");
        validation_failures_total("invalid_position");
    }
}
