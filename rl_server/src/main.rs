//! Referee lights server.
//!
//! Hosts a single lift state machine and serves it to referee, jury, and
//! display clients over WebSocket.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use log::{info, warn};
use pico_args::Arguments;
use referee_lights::LiftService;
use rl_server::{
    api::{self, AppState, gateway::LiftGateway},
    config::ServerConfig,
    logging, metrics,
};

const HELP: &str = "\
Run the referee lights server

USAGE:
  rl_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env HOST:PORT or 0.0.0.0:3000]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  HOST                     Listening host (default 0.0.0.0)
  PORT                     Listening port (default 3000)
  CORS_ORIGIN              Allowed cross-origin value (default *)
  AUTH_TOKEN               Shared secret required from every client (unset = no auth)
  METRICS_BIND             Prometheus exporter address, e.g. 0.0.0.0:9090 (unset = disabled)
  RUST_LOG                 Log filter (default info)
  (A .env file in the working directory is loaded first)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs
        .opt_value_from_str("--bind")
        .context("Invalid --bind address")?;

    let config = ServerConfig::from_env(bind)?;
    config.validate()?;

    logging::init();
    info!("Starting referee lights server at {}", config.bind);

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(Error::msg)?;
        info!("Prometheus metrics exposed at http://{}/metrics", metrics_bind);
    }

    if config.auth_token.is_none() {
        warn!("AUTH_TOKEN is not set; accepting unauthenticated clients");
    }

    let service = Arc::new(LiftService::new());
    let gateway = LiftGateway::new(service, config.auth_token.clone());
    let app = api::create_router(
        AppState {
            gateway: Arc::clone(&gateway),
        },
        &config.cors_origin,
    );

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    gateway.shutdown();

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
