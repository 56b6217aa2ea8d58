//! Integration tests for the HTTP routes.
//!
//! Tests health reporting, the token-protected state endpoint, CORS, and
//! request IDs.

use axum::body::Body;
use axum::http::{HeaderValue, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use referee_lights::{Decision, LiftService, LiftState, Position, messages::StateUpdate};
use rl_server::api::{AppState, create_router, gateway::LiftGateway, request_id::REQUEST_ID_HEADER};
use rl_server::config::CorsOrigin;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

/// Helper to create test server
fn create_test_server(auth_token: Option<&str>, cors: CorsOrigin) -> (axum::Router, Arc<LiftGateway>) {
    let gateway = LiftGateway::new(
        Arc::new(LiftService::new()),
        auth_token.map(str::to_string),
    );
    let app = create_router(
        AppState {
            gateway: Arc::clone(&gateway),
        },
        &cors,
    );
    (app, gateway)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let (app, gateway) = create_test_server(Some("s3cret"), CorsOrigin::Any);
    gateway.service().referee_connected(Position::Chief);

    // Health stays public even when a token is configured
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["state"], "awaitingDecisions");
    assert_eq!(body["connections"], 0);
    assert_eq!(body["connectedReferees"], serde_json::json!(["chief"]));
    assert!(body["timestamp"].is_string());
}

// ============================================================================
// State Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_state_endpoint_without_auth() {
    let (app, gateway) = create_test_server(None, CorsOrigin::Any);
    gateway
        .service()
        .make_decision(Position::Left, Decision::Red);

    let response = app.oneshot(get("/api/v1/state")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let update: StateUpdate = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(update.state, LiftState::CollectingDecisions);
    assert_eq!(update.context.decisions.len(), 1);
    assert_eq!(update.context.decisions[0].position, Position::Left);
    assert_eq!(update.context.decisions[0].decision, Decision::Red);
}

#[tokio::test]
async fn test_state_endpoint_requires_token() {
    let (app, _) = create_test_server(Some("s3cret"), CorsOrigin::Any);

    let response = app.clone().oneshot(get("/api/v1/state")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(get("/api/v1/state?token=wrong"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(get("/api/v1/state?token=s3cret"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .uri("/api/v1/state")
        .header(header::AUTHORIZATION, "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_websocket_route_requires_upgrade() {
    let (app, _) = create_test_server(None, CorsOrigin::Any);

    let response = app.oneshot(get("/ws")).await.unwrap();
    assert!(response.status().is_client_error());
}

// ============================================================================
// Middleware Tests
// ============================================================================

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let (app, _) = create_test_server(None, CorsOrigin::Any);

    let request = Request::builder()
        .uri("/health")
        .header(REQUEST_ID_HEADER, "lift-7")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "lift-7");

    let response = app.oneshot(get("/health")).await.unwrap();
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}

fn preflight(origin: &'static str) -> Request<Body> {
    Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/state")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_cors_any_origin() {
    let (app, _) = create_test_server(None, CorsOrigin::Any);

    let response = app.oneshot(preflight("https://display.example.com")).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(!headers.contains_key(header::ACCESS_CONTROL_ALLOW_CREDENTIALS));
}

#[tokio::test]
async fn test_cors_exact_origin_allows_credentials() {
    let origin = HeaderValue::from_static("https://display.example.com");
    let (app, _) = create_test_server(Some("s3cret"), CorsOrigin::Exact(origin));

    let response = app
        .clone()
        .oneshot(preflight("https://display.example.com"))
        .await
        .unwrap();
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://display.example.com"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

    // The configured origin is always sent, never the caller's, so the
    // browser rejects other origins itself
    let response = app.oneshot(preflight("https://elsewhere.example.com")).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://display.example.com"
    );
}

#[tokio::test]
async fn test_rejected_request_keeps_request_id() {
    let (app, _) = create_test_server(Some("s3cret"), CorsOrigin::Any);

    // The auth layer runs inside the request ID layer, so rejections are tagged
    let request = Request::builder()
        .uri("/api/v1/state")
        .header(REQUEST_ID_HEADER, "lift-9")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "lift-9");
}
