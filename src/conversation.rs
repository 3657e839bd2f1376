//! Conversation manager: session lifecycle, message ordering, and
//! context-window assembly for a tutoring turn

use std::sync::Arc;
use std::time::Instant;

use chrono::Local;

use crate::db::{ChatMessage, ChatSession, MessageRole};
use crate::prompt::{DEFAULT_CONTEXT_WINDOW, TUTOR_SYSTEM_PROMPT, build_context};
use crate::providers::CompletionProvider;
use crate::store::ConversationStore;
use crate::{Error, Result};

/// Reply persisted when the provider returns no content
pub const FALLBACK_REPLY: &str = "Lo siento, no pude entender. (Sorry, I couldn't understand.)";

/// Tunables for a [`ConversationManager`]
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Fixed system instruction placed first in every context
    pub system_prompt: String,
    /// Maximum number of prior messages sent to the provider
    pub context_window: usize,
    /// Reply used when the provider answers with nothing
    pub fallback_reply: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: TUTOR_SYSTEM_PROMPT.to_string(),
            context_window: DEFAULT_CONTEXT_WINDOW,
            fallback_reply: FALLBACK_REPLY.to_string(),
        }
    }
}

/// Result of a completed turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Assistant reply text as persisted
    pub reply: String,
    /// Session the turn was recorded in, for client-side continuation
    pub session_id: String,
    /// Identifier of the persisted assistant message
    pub message_id: String,
}

/// Handles chat turns against an injected store and provider
///
/// Turns for the same session are not serialized; callers are expected to
/// keep at most one turn in flight per session. A retried turn appends the
/// user message again.
#[derive(Clone)]
pub struct ConversationManager {
    store: Arc<dyn ConversationStore>,
    provider: Arc<dyn CompletionProvider>,
    config: ConversationConfig,
}

impl ConversationManager {
    /// Create a manager with the default tutor configuration
    #[must_use]
    pub fn new(store: Arc<dyn ConversationStore>, provider: Arc<dyn CompletionProvider>) -> Self {
        Self::with_config(store, provider, ConversationConfig::default())
    }

    /// Create a manager with explicit configuration
    #[must_use]
    pub fn with_config(
        store: Arc<dyn ConversationStore>,
        provider: Arc<dyn CompletionProvider>,
        config: ConversationConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &ConversationConfig {
        &self.config
    }

    /// Handle one user turn
    ///
    /// Resolves (or lazily creates) the caller's session, persists the user
    /// message, asks the provider once, and persists the reply.
    ///
    /// # Errors
    ///
    /// - [`Error::Unauthorized`] if `caller` is missing or blank
    /// - [`Error::InvalidInput`] if `message` is blank
    /// - store or provider errors, unretried; writes made before the failure remain
    pub async fn handle_turn(
        &self,
        caller: Option<&str>,
        session_id: Option<&str>,
        message: &str,
    ) -> Result<TurnOutcome> {
        let user_id = authorize(caller)?;
        if message.trim().is_empty() {
            return Err(Error::InvalidInput("Message is required".to_string()));
        }

        let (session, created) = self.resolve_session(user_id, session_id)?;

        // History is read before the new message lands so it is not duplicated
        let history = if created {
            Vec::new()
        } else {
            self.store
                .recent_messages(&session.id, self.config.context_window)?
        };

        self.store
            .append_message(&session.id, MessageRole::User, message)?;

        let context = build_context(&self.config.system_prompt, &history, message);

        tracing::debug!(
            session_id = %session.id,
            created,
            history = history.len(),
            provider = self.provider.name(),
            "requesting completion"
        );

        let started = Instant::now();
        let completion = self.provider.complete(&context).await.inspect_err(|e| {
            tracing::warn!(session_id = %session.id, error = %e, "completion failed");
        })?;

        let reply = if completion.trim().is_empty() {
            tracing::warn!(session_id = %session.id, "empty completion, using fallback reply");
            self.config.fallback_reply.clone()
        } else {
            completion
        };

        let saved = self
            .store
            .append_message(&session.id, MessageRole::Assistant, &reply)?;

        tracing::info!(
            session_id = %session.id,
            message_id = %saved.id,
            created,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "chat turn completed"
        );

        Ok(TurnOutcome {
            reply,
            session_id: session.id,
            message_id: saved.id,
        })
    }

    /// List the caller's sessions, most recently active first
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] without a caller, or a store error
    pub fn sessions(&self, caller: Option<&str>) -> Result<Vec<ChatSession>> {
        let user_id = authorize(caller)?;
        self.store.list_sessions(user_id)
    }

    /// Full ordered history of one of the caller's sessions
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] without a caller, [`Error::NotFound`]
    /// if the session does not exist for this caller, or a store error
    pub fn history(&self, caller: Option<&str>, session_id: &str) -> Result<Vec<ChatMessage>> {
        let user_id = authorize(caller)?;
        let session = self
            .store
            .find_session(session_id, user_id)?
            .ok_or_else(|| Error::NotFound(format!("session {session_id}")))?;
        self.store.session_messages(&session.id)
    }

    /// Look up the requested session, or create a fresh one
    fn resolve_session(
        &self,
        user_id: &str,
        session_id: Option<&str>,
    ) -> Result<(ChatSession, bool)> {
        if let Some(id) = session_id.filter(|id| !id.is_empty()) {
            if let Some(session) = self.store.find_session(id, user_id)? {
                return Ok((session, false));
            }
            tracing::debug!(session_id = id, user_id, "session not found for caller, starting new");
        }

        let session = self.store.create_session(user_id, &default_title())?;
        Ok((session, true))
    }
}

fn authorize(caller: Option<&str>) -> Result<&str> {
    caller
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(Error::Unauthorized)
}

/// Title for a lazily created session, e.g. `Chat 10/19/2026`
fn default_title() -> String {
    format!("Chat {}", Local::now().format("%-m/%-d/%Y"))
}
