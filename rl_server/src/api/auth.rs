//! Shared-secret authentication.
//!
//! A connection presents its credential either as an
//! `Authorization: Bearer <token>` header or as a `?token=` query parameter.
//! The header wins when both are present and non-empty.

use axum::{
    extract::{Query, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use super::{AppState, request_id::RequestId};
use crate::logging::log_security_event;

/// Message sent to a client whose credential was rejected.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid authentication token";

/// Query parameters that may carry the credential.
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// Pick the first non-empty credential, header before query.
pub fn extract_credential(headers: &HeaderMap, query_token: Option<&str>) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    from_header
        .into_iter()
        .chain(query_token)
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

/// Compare tokens without leaking the position of the first mismatch.
pub fn token_matches(expected: &str, presented: &str) -> bool {
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

/// Reject HTTP requests without the configured token.
///
/// Passes everything through when no token is configured. Rejections are
/// logged with the request ID assigned by the outer middleware.
pub async fn require_token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let credential = extract_credential(request.headers(), query.token.as_deref());

    if state.gateway.authorize(credential.as_deref()) {
        Ok(next.run(request).await)
    } else {
        let request_id = request.extensions().get::<RequestId>().map(RequestId::as_str);
        log_security_event("http_auth_rejected", request_id, INVALID_TOKEN_MESSAGE);
        Err(StatusCode::UNAUTHORIZED)
    }
}
