pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::ChatClient;

/// Persona sent as the system message of every request
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Chat message for LLM communication
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Per-call sampling options
#[derive(Debug, Clone, PartialEq)]
pub struct AskOptions {
    /// Overrides the configured model when set
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.7,
            max_tokens: 200,
        }
    }
}

/// Classified failure of a chat-completion call.
///
/// The `Display` text is what the user sees.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LLMError {
    #[error("API authentication failed: {0}")]
    Authentication(String),

    #[error("API rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Unable to connect to the API, check the network or the API server address ({0})")]
    Connection(String),

    #[error("API request failed (status {status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("Unknown error while calling the LLM: {0}")]
    Unknown(String),

    #[error("Model response error: model '{model}' returned no choices")]
    NoChoices { model: String },

    #[error("Malformed model response: message content is empty")]
    EmptyContent,
}

/// Something that can answer a single prompt
#[async_trait]
pub trait LLM: Send + Sync {
    /// Ask with explicit sampling options
    async fn ask_with(&self, prompt: &str, options: &AskOptions) -> Result<String, LLMError>;

    /// Ask with the default options (temperature 0.7, 200 tokens)
    async fn ask(&self, prompt: &str) -> Result<String, LLMError> {
        self.ask_with(prompt, &AskOptions::default()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ask_options() {
        let options = AskOptions::default();
        assert_eq!(options.model, None);
        assert_eq!(options.temperature, 0.7);
        assert_eq!(options.max_tokens, 200);
    }

    #[test]
    fn test_error_messages_carry_detail() {
        let err = LLMError::Authentication("Invalid API-key provided.".to_string());
        assert_eq!(err.to_string(), "API authentication failed: Invalid API-key provided.");

        let err = LLMError::Api {
            status: 500,
            detail: "internal".to_string(),
        };
        assert_eq!(err.to_string(), "API request failed (status 500): internal");
    }
}
