//! Persistence seam used by the conversation manager

use crate::Result;
use crate::db::{ChatMessage, ChatSession, MessageRole, SessionRepo};

/// Session and message storage
///
/// Each call is an independent CRUD operation; no transaction spans
/// `create_session` and `append_message`.
pub trait ConversationStore: Send + Sync {
    /// Find a session by ID that is owned by `owner_id`
    ///
    /// # Errors
    ///
    /// Returns error if the store is unavailable
    fn find_session(&self, id: &str, owner_id: &str) -> Result<Option<ChatSession>>;

    /// Create a new session for `owner_id`
    ///
    /// # Errors
    ///
    /// Returns error if the store is unavailable
    fn create_session(&self, owner_id: &str, title: &str) -> Result<ChatSession>;

    /// Append an immutable message to a session
    ///
    /// # Errors
    ///
    /// Returns error if the session does not exist or the store is unavailable
    fn append_message(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatMessage>;

    /// Most recent `limit` messages of a session, oldest first
    ///
    /// # Errors
    ///
    /// Returns error if the store is unavailable
    fn recent_messages(&self, session_id: &str, limit: usize) -> Result<Vec<ChatMessage>>;

    /// Every message of a session, oldest first
    ///
    /// # Errors
    ///
    /// Returns error if the store is unavailable
    fn session_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>>;

    /// Sessions owned by `owner_id`, most recently active first
    ///
    /// # Errors
    ///
    /// Returns error if the store is unavailable
    fn list_sessions(&self, owner_id: &str) -> Result<Vec<ChatSession>>;
}

impl ConversationStore for SessionRepo {
    fn find_session(&self, id: &str, owner_id: &str) -> Result<Option<ChatSession>> {
        self.find(id, owner_id)
    }

    fn create_session(&self, owner_id: &str, title: &str) -> Result<ChatSession> {
        self.create(owner_id, title)
    }

    fn append_message(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatMessage> {
        self.add_message(session_id, role, content)
    }

    fn recent_messages(&self, session_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        Self::recent_messages(self, session_id, limit)
    }

    fn session_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        self.messages(session_id)
    }

    fn list_sessions(&self, owner_id: &str) -> Result<Vec<ChatSession>> {
        self.list_for_user(owner_id)
    }
}
