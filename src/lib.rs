//! Fluento - conversation service for the Fluento AI language tutor
//!
//! This library provides the chat-tutor back end:
//! - Chat session lifecycle and ordered message persistence (`SQLite`)
//! - Context-window assembly around a fixed tutor persona prompt
//! - A completion provider seam with an OpenAI-compatible client
//! - An HTTP API exposing chat turns and session history
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │          Front-end (authenticated)           │
//! └──────────────────────┬───────────────────────┘
//!                        │ x-fluento-user
//! ┌──────────────────────▼───────────────────────┐
//! │   API  →  ConversationManager                │
//! │              │                 │             │
//! │   ConversationStore    CompletionProvider    │
//! │      (SQLite)             (OpenAI)           │
//! └──────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod conversation;
pub mod db;
pub mod error;
pub mod prompt;
pub mod providers;
pub mod store;

pub use config::Config;
pub use conversation::{ConversationConfig, ConversationManager, FALLBACK_REPLY, TurnOutcome};
pub use db::DbPool;
pub use error::{Error, ErrorKind, Result};
pub use prompt::{PromptMessage, PromptRole, TUTOR_SYSTEM_PROMPT};
pub use providers::{CompletionProvider, OpenAiConfig, OpenAiProvider};
pub use store::ConversationStore;
