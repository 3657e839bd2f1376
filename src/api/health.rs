//! Health check endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use super::{ApiState, ModelInfo};

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed readiness response
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
}

/// Individual readiness checks
#[derive(Serialize)]
pub struct ReadinessChecks {
    pub database: CheckResult,
}

/// Result of a single health check
#[derive(Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    const fn ok() -> Self {
        Self {
            status: "ok",
            message: None,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            status: "fail",
            message: Some(message.into()),
        }
    }
}

/// Liveness probe - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe - is the service ready to accept traffic?
async fn ready(State(state): State<Arc<ApiState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let database = check_database(&state);
    let all_ok = database.status == "ok";

    let (status, http_status) = if all_ok {
        ("ok", StatusCode::OK)
    } else {
        ("degraded", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        http_status,
        Json(ReadinessResponse {
            status,
            checks: ReadinessChecks { database },
        }),
    )
}

/// Check database connectivity
fn check_database(state: &ApiState) -> CheckResult {
    match state.db.get() {
        Ok(conn) => match conn.query_row("SELECT 1", [], |_| Ok(())) {
            Ok(()) => CheckResult::ok(),
            Err(e) => CheckResult::fail(format!("query failed: {e}")),
        },
        Err(e) => CheckResult::fail(format!("connection failed: {e}")),
    }
}

/// Service status response including model info
#[derive(Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub context_window: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelInfo>,
}

/// Get service status
async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        context_window: state.conversations.config().context_window,
        model: state.model_info.clone(),
    })
}

/// Build health router (liveness only, no state needed)
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Build readiness router (needs state for checks)
pub fn ready_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/ready", get(ready))
        .route("/status", get(status))
        .with_state(state)
}
