//! API key authentication middleware and caller identity

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;

use super::{ApiError, ApiState};
use crate::Error;

/// Header carrying the authenticated user ID, set by the trusted front-end
pub const CALLER_HEADER: &str = "x-fluento-user";

/// Extract API key from Authorization header
fn extract_api_key(req: &Request) -> Option<&str> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Caller identity forwarded by the front-end, if any
pub fn caller_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Middleware to verify API key
pub async fn require_api_key(
    State(state): State<Arc<ApiState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // If no API key configured, allow all requests (development mode)
    let Some(expected_key) = &state.api_key else {
        return Ok(next.run(req).await);
    };

    match extract_api_key(&req) {
        Some(key) if key == expected_key.expose_secret() => Ok(next.run(req).await),
        Some(_) => {
            tracing::warn!("invalid API key provided");
            Err(ApiError(Error::Unauthorized))
        }
        None => {
            tracing::debug!("no API key provided");
            Err(ApiError(Error::Unauthorized))
        }
    }
}
