//! Chat turn endpoint

use std::sync::Arc;

use axum::{Json, Router, body::Bytes, extract::State, http::HeaderMap, routing::post};
use serde::{Deserialize, Serialize};

use super::auth::caller_id;
use super::{ApiError, ApiState};
use crate::Error;

/// Chat turn request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    /// Session to continue; omitted for a new conversation
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Chat turn response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    /// Assistant reply
    pub message: String,
    pub session_id: String,
    pub message_id: String,
}

/// Handle one tutoring turn
///
/// The caller is checked before the body is looked at, and a body that does
/// not parse is answered like a missing message.
async fn chat(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ChatResponse>, ApiError> {
    let caller = caller_id(&headers).ok_or(ApiError(Error::Unauthorized))?;

    let request: ChatRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "rejected chat body");
        ApiError(Error::InvalidInput("Message is required".to_string()))
    })?;

    let outcome = state
        .conversations
        .handle_turn(
            Some(caller),
            request.session_id.as_deref(),
            request.message.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(Json(ChatResponse {
        message: outcome.reply,
        session_id: outcome.session_id,
        message_id: outcome.message_id,
    }))
}

/// Build chat router
pub fn router() -> Router<Arc<ApiState>> {
    Router::new().route("/chat", post(chat))
}
