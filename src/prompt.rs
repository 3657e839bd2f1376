//! Tutor system prompt and context-window assembly

use serde::Serialize;

use crate::db::{ChatMessage, MessageRole};

/// Number of prior messages included in each completion request
pub const DEFAULT_CONTEXT_WINDOW: usize = 10;

/// Fixed instruction describing the tutor persona and pedagogy rules
pub const TUTOR_SYSTEM_PROMPT: &str = "You are Sofia, a friendly and enthusiastic Spanish tutor AI. \
Your role is to help users learn Spanish through natural conversation.

Guidelines:
- Always respond in a mix of Spanish and English, gradually increasing Spanish as the user improves
- Provide gentle corrections when users make mistakes
- Ask engaging questions to keep the conversation flowing
- Focus on practical, everyday Spanish
- Be encouraging and supportive
- If the user seems to be a beginner, speak more in English with simple Spanish phrases
- If the user is advanced, speak mostly in Spanish
- Always provide translations for new Spanish words or phrases
- Make learning fun and interactive

Current conversation context: This is a Spanish learning session. \
Help the user practice Spanish conversation naturally.";

/// Role label understood by the completion provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

impl From<MessageRole> for PromptRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => Self::User,
            MessageRole::Assistant => Self::Assistant,
        }
    }
}

/// One entry of the ordered context sent to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    #[must_use]
    pub fn new(role: PromptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Build the ordered provider context for a turn
///
/// The system prompt comes first, then `history` in the order given (callers
/// pass it oldest first), then the new user message.
#[must_use]
pub fn build_context(
    system_prompt: &str,
    history: &[ChatMessage],
    new_message: &str,
) -> Vec<PromptMessage> {
    let mut context = Vec::with_capacity(history.len() + 2);
    context.push(PromptMessage::new(PromptRole::System, system_prompt));
    context.extend(
        history
            .iter()
            .map(|m| PromptMessage::new(m.role.into(), m.content.clone())),
    );
    context.push(PromptMessage::new(PromptRole::User, new_message));
    context
}
