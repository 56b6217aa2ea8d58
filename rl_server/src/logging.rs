//! Structured logging configuration.
//!
//! Library code logs through the `log` facade; the subscriber installed here
//! forwards those records into `tracing` alongside the server's own events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info,tower_http=warn,hyper=warn";

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use rl_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// # Arguments
///
/// * `event_type` - Type of security event
/// * `correlation_id` - Connection or request ID the event belongs to, if known
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use rl_server::logging::log_security_event;
///
/// log_security_event("ws_auth_rejected", Some("3f2c0d9e"), "Invalid authentication token");
/// ```
pub fn log_security_event(event_type: &str, correlation_id: Option<&str>, message: &str) {
    tracing::warn!(
        event_type = event_type,
        correlation_id = correlation_id,
        "SECURITY: {}",
        message
    );
}
