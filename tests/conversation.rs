//! Conversation manager integration tests

use std::sync::Arc;

use fluento::db::{ChatMessage, ChatSession, MessageRole};
use fluento::{
    ConversationConfig, ConversationManager, ConversationStore, Error, ErrorKind,
    FALLBACK_REPLY, PromptRole, Result, TUTOR_SYSTEM_PROMPT,
};

mod common;
use common::{Reply, ScriptedProvider, setup_manager};

#[tokio::test]
async fn test_first_turn_creates_session_and_two_messages() {
    let provider = ScriptedProvider::new(vec![Reply::Text("¡Hola! ¿Cómo estás?".into())]);
    let (manager, repo) = setup_manager(provider.clone());

    let outcome = manager
        .handle_turn(Some("learner-1"), None, "Hola")
        .await
        .unwrap();

    assert_eq!(outcome.reply, "¡Hola! ¿Cómo estás?");

    let sessions = repo.list_for_user("learner-1").unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, outcome.session_id);
    assert!(sessions[0].title.starts_with("Chat "));

    let messages = repo.messages(&outcome.session_id).unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[0].content, "Hola");
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert_eq!(messages[1].content, "¡Hola! ¿Cómo estás?");
    assert_eq!(messages[1].id, outcome.message_id);

    // Context for an empty history is [system, "Hola"]
    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].len(), 2);
    assert_eq!(calls[0][0].role, PromptRole::System);
    assert_eq!(calls[0][0].content, TUTOR_SYSTEM_PROMPT);
    assert_eq!(calls[0][1].role, PromptRole::User);
    assert_eq!(calls[0][1].content, "Hola");
}

#[tokio::test]
async fn test_existing_session_appends_in_order() {
    let provider = ScriptedProvider::new(vec![
        Reply::Text("¡Hola!".into()),
        Reply::Text("Muy bien.".into()),
    ]);
    let (manager, repo) = setup_manager(provider.clone());

    let first = manager
        .handle_turn(Some("learner-1"), None, "Hola")
        .await
        .unwrap();
    let second = manager
        .handle_turn(Some("learner-1"), Some(&first.session_id), "¿Qué tal?")
        .await
        .unwrap();

    assert_eq!(first.session_id, second.session_id);
    assert_eq!(repo.list_for_user("learner-1").unwrap().len(), 1);

    let messages = repo.messages(&first.session_id).unwrap();
    let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["Hola", "¡Hola!", "¿Qué tal?", "Muy bien."]);
    for pair in messages.windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
    }

    // Second context carries the prior exchange, then the new message
    let calls = provider.calls();
    let roles: Vec<_> = calls[1].iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            PromptRole::System,
            PromptRole::User,
            PromptRole::Assistant,
            PromptRole::User
        ]
    );
    assert_eq!(calls[1][3].content, "¿Qué tal?");
}

#[tokio::test]
async fn test_context_window_keeps_last_ten_in_order() {
    let provider = ScriptedProvider::new(Vec::new());
    let (manager, repo) = setup_manager(provider.clone());

    let session = repo.create("learner-1", "Chat").unwrap();
    for i in 0..15 {
        let role = if i % 2 == 0 {
            MessageRole::User
        } else {
            MessageRole::Assistant
        };
        repo.add_message(&session.id, role, &format!("m{i}"))
            .unwrap();
    }

    manager
        .handle_turn(Some("learner-1"), Some(&session.id), "nuevo")
        .await
        .unwrap();

    let calls = provider.calls();
    let context = &calls[0];
    assert_eq!(context.len(), 12);
    assert_eq!(context[0].role, PromptRole::System);

    let history: Vec<_> = context[1..11].iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        history,
        vec!["m5", "m6", "m7", "m8", "m9", "m10", "m11", "m12", "m13", "m14"]
    );
    assert_eq!(context[1].role, PromptRole::Assistant);
    assert_eq!(context[11].content, "nuevo");
    assert_eq!(context[11].role, PromptRole::User);
}

#[tokio::test]
async fn test_custom_context_window() {
    let provider = ScriptedProvider::new(Vec::new());
    let repo = fluento::db::SessionRepo::new(common::setup_test_db());
    let manager = ConversationManager::with_config(
        Arc::new(repo.clone()),
        provider.clone(),
        ConversationConfig {
            context_window: 2,
            ..ConversationConfig::default()
        },
    );

    let first = manager
        .handle_turn(Some("learner-1"), None, "uno")
        .await
        .unwrap();
    manager
        .handle_turn(Some("learner-1"), Some(&first.session_id), "dos")
        .await
        .unwrap();
    manager
        .handle_turn(Some("learner-1"), Some(&first.session_id), "tres")
        .await
        .unwrap();

    let calls = provider.calls();
    assert_eq!(calls[2].len(), 4);
    assert_eq!(calls[2][1].content, "dos");
    assert_eq!(calls[2][3].content, "tres");
}

#[tokio::test]
async fn test_empty_reply_uses_fallback() {
    let provider = ScriptedProvider::new(vec![Reply::Text("   ".into())]);
    let (manager, repo) = setup_manager(provider);

    let outcome = manager
        .handle_turn(Some("learner-1"), None, "Hola")
        .await
        .unwrap();

    assert_eq!(outcome.reply, FALLBACK_REPLY);
    let messages = repo.messages(&outcome.session_id).unwrap();
    assert_eq!(messages[1].content, FALLBACK_REPLY);
}

#[tokio::test]
async fn test_unauthorized_writes_nothing() {
    let provider = ScriptedProvider::new(Vec::new());
    let (manager, repo) = setup_manager(provider.clone());

    let err = manager.handle_turn(None, None, "Hola").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let err = manager.handle_turn(Some(""), None, "Hola").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    assert!(provider.calls().is_empty());
    assert!(repo.list_for_user("").unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_message_rejected() {
    let provider = ScriptedProvider::new(Vec::new());
    let (manager, repo) = setup_manager(provider.clone());

    let err = manager
        .handle_turn(Some("learner-1"), None, "  ")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    assert!(provider.calls().is_empty());
    assert!(repo.list_for_user("learner-1").unwrap().is_empty());
}

#[tokio::test]
async fn test_provider_failure_keeps_user_message() {
    let provider = ScriptedProvider::new(vec![Reply::Fail("503 upstream".into())]);
    let (manager, repo) = setup_manager(provider.clone());

    let err = manager
        .handle_turn(Some("learner-1"), None, "Hola")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamFailure);

    // Single attempt, no retry
    assert_eq!(provider.calls().len(), 1);

    let sessions = repo.list_for_user("learner-1").unwrap();
    assert_eq!(sessions.len(), 1);
    let messages = repo.messages(&sessions[0].id).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::User);
}

#[tokio::test]
async fn test_foreign_session_starts_new() {
    let provider = ScriptedProvider::new(Vec::new());
    let (manager, repo) = setup_manager(provider);

    let theirs = manager
        .handle_turn(Some("learner-1"), None, "Hola")
        .await
        .unwrap();
    let mine = manager
        .handle_turn(Some("learner-2"), Some(&theirs.session_id), "Buenos días")
        .await
        .unwrap();

    assert_ne!(theirs.session_id, mine.session_id);
    assert_eq!(repo.messages(&theirs.session_id).unwrap().len(), 2);
    assert_eq!(repo.messages(&mine.session_id).unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_session_starts_new() {
    let provider = ScriptedProvider::new(Vec::new());
    let (manager, repo) = setup_manager(provider);

    let outcome = manager
        .handle_turn(Some("learner-1"), Some("does-not-exist"), "Hola")
        .await
        .unwrap();

    assert_ne!(outcome.session_id, "does-not-exist");
    assert_eq!(repo.list_for_user("learner-1").unwrap().len(), 1);
}

#[tokio::test]
async fn test_retry_duplicates_user_message() {
    let provider = ScriptedProvider::new(Vec::new());
    let (manager, repo) = setup_manager(provider);

    let first = manager
        .handle_turn(Some("learner-1"), None, "Hola")
        .await
        .unwrap();
    manager
        .handle_turn(Some("learner-1"), Some(&first.session_id), "Hola")
        .await
        .unwrap();

    let user_messages = repo
        .messages(&first.session_id)
        .unwrap()
        .into_iter()
        .filter(|m| m.role == MessageRole::User)
        .count();
    assert_eq!(user_messages, 2);
}

#[tokio::test]
async fn test_history_and_sessions() {
    let provider = ScriptedProvider::new(Vec::new());
    let (manager, _repo) = setup_manager(provider);

    let outcome = manager
        .handle_turn(Some("learner-1"), None, "Hola")
        .await
        .unwrap();

    let history = manager
        .history(Some("learner-1"), &outcome.session_id)
        .unwrap();
    assert_eq!(history.len(), 2);

    let err = manager
        .history(Some("learner-2"), &outcome.session_id)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(manager.sessions(Some("learner-1")).unwrap().len(), 1);
    assert!(manager.sessions(Some("learner-2")).unwrap().is_empty());
    assert_eq!(
        manager.sessions(None).unwrap_err().kind(),
        ErrorKind::Unauthorized
    );
}

/// Store whose writes always fail
struct BrokenStore;

impl ConversationStore for BrokenStore {
    fn find_session(&self, _id: &str, _owner_id: &str) -> Result<Option<ChatSession>> {
        Ok(None)
    }

    fn create_session(&self, _owner_id: &str, _title: &str) -> Result<ChatSession> {
        Err(Error::Database("disk I/O error".into()))
    }

    fn append_message(
        &self,
        _session_id: &str,
        _role: MessageRole,
        _content: &str,
    ) -> Result<ChatMessage> {
        Err(Error::Database("disk I/O error".into()))
    }

    fn recent_messages(&self, _session_id: &str, _limit: usize) -> Result<Vec<ChatMessage>> {
        Ok(Vec::new())
    }

    fn session_messages(&self, _session_id: &str) -> Result<Vec<ChatMessage>> {
        Ok(Vec::new())
    }

    fn list_sessions(&self, _owner_id: &str) -> Result<Vec<ChatSession>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_store_failure_skips_provider() {
    let provider = ScriptedProvider::new(Vec::new());
    let manager = ConversationManager::new(Arc::new(BrokenStore), provider.clone());

    let err = manager
        .handle_turn(Some("learner-1"), None, "Hola")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UpstreamFailure);
    assert!(provider.calls().is_empty());
}
