//! Completion providers
//!
//! A provider is stateless: it receives the full ordered context for a turn
//! and returns the assistant text. Fixed model parameters live on the
//! provider instance, not on the request.

mod openai;

use async_trait::async_trait;

use crate::Result;
use crate::prompt::PromptMessage;

pub use openai::{DEFAULT_BASE_URL, OpenAiConfig, OpenAiProvider};

/// Text completion over an ordered message list
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete the conversation, returning the assistant text
    ///
    /// An empty string means the provider produced no content.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the provider rejects it
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String>;

    /// Short identifier for logs
    fn name(&self) -> &str;
}
