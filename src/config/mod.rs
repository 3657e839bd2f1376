//! Configuration management for the Fluento conversation service

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use crate::conversation::ConversationConfig;
use crate::prompt::DEFAULT_CONTEXT_WINDOW;
use crate::providers::OpenAiConfig;
use crate::{Error, Result};

use self::file::FluentoConfigFile;

/// Fluento service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory (database)
    pub data_dir: PathBuf,

    /// Completion provider configuration
    pub llm: LlmConfig,

    /// HTTP API server configuration
    pub api_server: ApiServerConfig,

    /// Prior messages sent to the provider each turn
    pub context_window: usize,

    /// Override for the built-in tutor system prompt
    pub system_prompt: Option<String>,
}

/// Completion provider configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// `OpenAI` API key (from `OPENAI_API_KEY`)
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Shared secret for API callers (from `FLUENTO_API_KEY`)
    pub api_key: Option<SecretString>,

    /// Requests per minute across the API; `None` disables limiting
    pub rate_limit_per_minute: Option<u32>,
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if the data directory cannot be created
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(config_path);
        let config = Self::resolve(fc, |key| std::env::var(key).ok());

        std::fs::create_dir_all(&config.data_dir).map_err(|e| {
            Error::Config(format!(
                "failed to create data directory {}: {e}",
                config.data_dir.display()
            ))
        })?;

        Ok(config)
    }

    /// Merge a parsed config file with an environment lookup
    pub fn resolve(fc: FluentoConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let llm = LlmConfig {
            api_key: env("OPENAI_API_KEY")
                .or(fc.llm.api_key)
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            base_url: env("FLUENTO_OPENAI_BASE_URL")
                .or(fc.llm.base_url)
                .unwrap_or_else(|| crate::providers::DEFAULT_BASE_URL.to_string()),
            model: env("FLUENTO_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or_else(|| "gpt-3.5-turbo".to_string()),
            temperature: env("FLUENTO_LLM_TEMPERATURE")
                .and_then(|s| s.parse().ok())
                .or(fc.llm.temperature)
                .unwrap_or(0.7),
            max_tokens: env("FLUENTO_LLM_MAX_TOKENS")
                .and_then(|s| s.parse().ok())
                .or(fc.llm.max_tokens)
                .unwrap_or(300),
            timeout: Duration::from_secs(
                env("FLUENTO_LLM_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .or(fc.llm.timeout_secs)
                    .unwrap_or(30),
            ),
        };

        let api_server = ApiServerConfig {
            port: env("FLUENTO_PORT")
                .or_else(|| env("PORT"))
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(18800),
            api_key: env("FLUENTO_API_KEY")
                .or(fc.server.api_key)
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            rate_limit_per_minute: env("FLUENTO_RATE_LIMIT")
                .and_then(|s| s.parse().ok())
                .or(fc.server.rate_limit_per_minute)
                .filter(|n| *n > 0),
        };

        // ~/.local/share/fluento on Linux
        let data_dir = env("FLUENTO_DATA_DIR")
            .or(fc.data_dir)
            .map_or_else(default_data_dir, PathBuf::from);

        let context_window = env("FLUENTO_CONTEXT_WINDOW")
            .and_then(|s| s.parse().ok())
            .or(fc.conversation.context_window)
            .unwrap_or(DEFAULT_CONTEXT_WINDOW);

        Self {
            data_dir,
            llm,
            api_server,
            context_window,
            system_prompt: fc.conversation.system_prompt,
        }
    }

    /// Path of the `SQLite` database
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("fluento.db")
    }

    /// Provider settings, requiring an API key
    ///
    /// # Errors
    ///
    /// Returns error if no `OpenAI` API key is configured
    pub fn openai_config(&self) -> Result<OpenAiConfig> {
        let api_key = self.llm.api_key.clone().ok_or_else(|| {
            Error::Config("OPENAI_API_KEY is not set (env or [llm].api_key)".to_string())
        })?;

        Ok(OpenAiConfig {
            api_key,
            base_url: self.llm.base_url.clone(),
            model: self.llm.model.clone(),
            temperature: self.llm.temperature,
            max_tokens: self.llm.max_tokens,
            timeout: self.llm.timeout,
        })
    }

    /// Conversation manager settings
    #[must_use]
    pub fn conversation_config(&self) -> ConversationConfig {
        let mut config = ConversationConfig {
            context_window: self.context_window,
            ..ConversationConfig::default()
        };
        if let Some(prompt) = &self.system_prompt {
            config.system_prompt.clone_from(prompt);
        }
        config
    }
}

fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map_or_else(|| PathBuf::from(".fluento"), |d| d.data_dir().join("fluento"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::resolve(FluentoConfigFile::default(), env_from(&[]));

        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.llm.max_tokens, 300);
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.api_server.port, 18800);
        assert!(config.api_server.api_key.is_none());
        assert!(config.api_server.rate_limit_per_minute.is_none());
        assert_eq!(config.context_window, 10);
        assert!(config.openai_config().is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let fc: FluentoConfigFile = toml::from_str(
            r#"
            data_dir = "/srv/fluento"

            [llm]
            model = "from-file"
            api_key = "sk-file"

            [server]
            port = 9000
            "#,
        )
        .unwrap();

        let config = Config::resolve(
            fc,
            env_from(&[("FLUENTO_LLM_MODEL", "from-env"), ("FLUENTO_PORT", "9100")]),
        );

        assert_eq!(config.llm.model, "from-env");
        assert_eq!(config.api_server.port, 9100);
        assert_eq!(config.data_dir, PathBuf::from("/srv/fluento"));
        assert_eq!(config.database_path(), PathBuf::from("/srv/fluento/fluento.db"));

        let openai = config.openai_config().unwrap();
        assert_eq!(openai.api_key.expose_secret(), "sk-file");
    }

    #[test]
    fn test_empty_keys_are_ignored() {
        let config = Config::resolve(
            FluentoConfigFile::default(),
            env_from(&[("OPENAI_API_KEY", ""), ("FLUENTO_API_KEY", "")]),
        );
        assert!(config.llm.api_key.is_none());
        assert!(config.api_server.api_key.is_none());
    }

    #[test]
    fn test_conversation_config_override() {
        let fc: FluentoConfigFile = toml::from_str(
            r#"
            [conversation]
            context_window = 4
            system_prompt = "You are a French tutor."
            "#,
        )
        .unwrap();

        let conversation = Config::resolve(fc, env_from(&[])).conversation_config();
        assert_eq!(conversation.context_window, 4);
        assert_eq!(conversation.system_prompt, "You are a French tutor.");
    }
}
