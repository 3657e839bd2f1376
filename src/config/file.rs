//! TOML configuration file loading
//!
//! Supports `~/.config/fluento/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct FluentoConfigFile {
    /// Directory holding the database
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Completion provider configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Conversation tuning
    #[serde(default)]
    pub conversation: ConversationFileConfig,
}

/// Completion provider settings
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// `OpenAI` API key
    pub api_key: Option<String>,

    /// API base URL (for OpenAI-compatible endpoints)
    pub base_url: Option<String>,

    /// Model identifier (e.g. "gpt-3.5-turbo")
    pub model: Option<String>,

    pub temperature: Option<f32>,

    pub max_tokens: Option<u32>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Shared secret required from the front-end
    pub api_key: Option<String>,

    /// Global request budget per minute
    pub rate_limit_per_minute: Option<u32>,
}

/// Conversation tuning
#[derive(Debug, Default, Deserialize)]
pub struct ConversationFileConfig {
    /// Prior messages sent to the provider each turn
    pub context_window: Option<usize>,

    /// Replacement for the built-in tutor system prompt
    pub system_prompt: Option<String>,
}

/// Load the config file, falling back to defaults when missing or invalid
///
/// An explicit `path` takes precedence over the default location.
pub fn load_config_file(path: Option<&Path>) -> FluentoConfigFile {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return FluentoConfigFile::default();
    };

    if !path.exists() {
        return FluentoConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                FluentoConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            FluentoConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/fluento/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("fluento").join("config.toml"))
}
