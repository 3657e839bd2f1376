//! `OpenAI`-compatible chat completions client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::CompletionProvider;
use crate::prompt::PromptMessage;
use crate::{Error, Result};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Fixed model parameters and connection settings
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Config with the tutor's default model parameters
    #[must_use]
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 300,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat completions provider
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create a new provider
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "chat completion failed: {status} - {body}"
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("invalid completion response: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        Ok(content)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::PromptRole;

    fn provider(base_url: String) -> OpenAiProvider {
        let mut config = OpenAiConfig::new(SecretString::from("sk-test".to_string()));
        config.base_url = base_url;
        OpenAiProvider::new(config).unwrap()
    }

    fn context() -> Vec<PromptMessage> {
        vec![
            PromptMessage::new(PromptRole::System, "sys"),
            PromptMessage::new(PromptRole::User, "Hola"),
        ]
    }

    #[test]
    fn test_request_serialization() {
        let messages = context();
        let request = ChatRequest {
            model: "gpt-3.5-turbo",
            messages: &messages,
            temperature: 0.7,
            max_tokens: 300,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["max_tokens"], 300);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Hola");
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "gpt-3.5-turbo",
                "max_tokens": 300,
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "Hola"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"¡Hola!"}}]}"#)
            .create_async()
            .await;

        let reply = provider(server.url()).complete(&context()).await.unwrap();

        assert_eq!(reply, "¡Hola!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_content_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
            .create_async()
            .await;

        let reply = provider(server.url()).complete(&context()).await.unwrap();
        assert!(reply.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_is_provider_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let err = provider(server.url())
            .complete(&context())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Provider(ref msg) if msg.contains("429")));
    }
}
