//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fluento::db::{self, SessionRepo};
use fluento::{CompletionProvider, ConversationManager, DbPool, Error, PromptMessage, Result};

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Canned provider behaviour for one call
pub enum Reply {
    Text(String),
    Fail(String),
}

/// Provider double that records every context it receives
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Vec<PromptMessage>>>,
}

impl ScriptedProvider {
    /// Provider answering with `replies` in order, then a default reply
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Contexts received so far
    pub fn calls(&self) -> Vec<Vec<PromptMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String> {
        self.calls.lock().unwrap().push(messages.to_vec());
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(msg)) => Err(Error::Provider(msg)),
            None => Ok("¡Muy bien!".to_string()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Manager over a fresh in-memory database and the given provider
pub fn setup_manager(provider: Arc<ScriptedProvider>) -> (ConversationManager, SessionRepo) {
    let repo = SessionRepo::new(setup_test_db());
    let manager = ConversationManager::new(Arc::new(repo.clone()), provider);
    (manager, repo)
}
