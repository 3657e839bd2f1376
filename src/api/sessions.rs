//! Session listing and history endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::auth::caller_id;
use super::{ApiError, ApiState};
use crate::db::{ChatMessage, ChatSession, MessageRole};

/// Session summary
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ChatSession> for SessionInfo {
    fn from(s: ChatSession) -> Self {
        Self {
            id: s.id,
            title: s.title,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// Response for listing sessions
#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionInfo>,
}

/// Stored message as returned to clients
#[derive(Debug, Serialize)]
pub struct MessageInfo {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ChatMessage> for MessageInfo {
    fn from(m: ChatMessage) -> Self {
        Self {
            id: m.id,
            role: m.role,
            content: m.content,
            timestamp: m.timestamp,
        }
    }
}

/// Response for a session's history
#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<MessageInfo>,
}

/// List the caller's sessions, most recently active first
async fn list_sessions(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<SessionListResponse>, ApiError> {
    let sessions = state.conversations.sessions(caller_id(&headers))?;

    Ok(Json(SessionListResponse {
        sessions: sessions.into_iter().map(SessionInfo::from).collect(),
    }))
}

/// Full ordered history of one session
async fn session_messages(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<Json<MessageListResponse>, ApiError> {
    let messages = state
        .conversations
        .history(caller_id(&headers), &session_id)?;

    Ok(Json(MessageListResponse {
        messages: messages.into_iter().map(MessageInfo::from).collect(),
    }))
}

/// Build sessions router
pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/{session_id}/messages", get(session_messages))
}
