//! HTTP/WebSocket API for the referee lights server.
//!
//! # Modules
//!
//! - [`gateway`]: Connection registry, validation, and broadcast
//! - [`websocket`]: Per-connection socket loop
//! - [`auth`]: Shared-secret token checks
//! - [`request_id`]: Request correlation IDs
//!
//! # Endpoints Overview
//!
//! ```text
//! GET /ws[?token=<secret>]    - WebSocket (token required when configured)
//! GET /health                 - Server health status (public)
//! GET /api/v1/state           - Current lift state (token required when configured)
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use referee_lights::LiftService;
//! use rl_server::{
//!     api::{AppState, create_router, gateway::LiftGateway},
//!     config::CorsOrigin,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = LiftGateway::new(Arc::new(LiftService::new()), None);
//! let app = create_router(AppState { gateway }, &CorsOrigin::Any);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod errors;
pub mod gateway;
pub mod request_id;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::{Method, header},
    middleware,
    response::{IntoResponse, Json},
    routing::get,
};
use referee_lights::messages::StateUpdate;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::CorsOrigin;
use gateway::LiftGateway;

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone, Debug)]
pub struct AppState {
    pub gateway: Arc<LiftGateway>,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState, cors: &CorsOrigin) -> Router {
    let v1_routes = Router::new()
        .route("/state", get(current_state))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_token,
        ));

    Router::new()
        .route("/health", get(health_check))
        // WebSocket route checks its own credential so it can answer over the socket
        .route("/ws", get(websocket::websocket_handler))
        .nest("/api/v1", v1_routes)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id::request_id_middleware))
                .layer(cors_layer(cors)),
        )
        .with_state(state)
}

/// Build the CORS layer for the configured origin.
///
/// Credentials are only allowed for an exact origin; browsers refuse them
/// alongside a wildcard.
pub fn cors_layer(origin: &CorsOrigin) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let layer = match origin {
        CorsOrigin::Any => layer.allow_origin(Any),
        CorsOrigin::Exact(value) => layer.allow_origin(AllowOrigin::exact(value.clone())),
    };
    layer.allow_credentials(origin.allows_credentials())
}

/// Health check endpoint for monitoring and load balancers.
///
/// # Example
///
/// ```bash
/// curl http://localhost:3000/health
/// # {"status":"healthy","version":"1.0.0","state":"awaitingDecisions","connections":2,"connectedReferees":["chief"],"timestamp":"2026-10-17T10:30:00+00:00"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.gateway.service().get_state();

    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "state": snapshot.state,
        "connections": state.gateway.connection_count(),
        "connectedReferees": snapshot.context.connected_referees,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Current lift state in the same shape as a `stateUpdate` payload.
async fn current_state(State(state): State<AppState>) -> Json<StateUpdate> {
    Json(StateUpdate::from(&state.gateway.service().get_state()))
}
