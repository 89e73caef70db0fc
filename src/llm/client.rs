use super::{AskOptions, ChatMessage, LLMError, LLM, SYSTEM_PROMPT};
use crate::config::{credential_from_env, resolve_credential, Config};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use url::Url;

/// Longest raw body excerpt quoted in an error message
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Client for an OpenAI compatible chat-completion endpoint
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatClient {
    /// Build a client, taking the token from the config or `DASHSCOPE_API_KEY`
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = resolve_credential(&config.base_config, credential_from_env());
        Self::with_credential(config, api_key)
    }

    /// Build a client with an already resolved credential
    pub fn with_credential(config: &Config, api_key: Option<String>) -> Result<Self> {
        if api_key.is_none() {
            warn!(
                "API key not found in the config file or the DASHSCOPE_API_KEY environment variable; API calls may fail"
            );
        }

        let base_url = config.base_config.api_url();
        let parsed = Url::parse(base_url).with_context(|| format!("Invalid api_url: {}", base_url))?;
        let endpoint = format!("{}/chat/completions", parsed.as_str().trim_end_matches('/'));

        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            model: config.base_config.model_name().to_string(),
            api_key,
        })
    }

    /// Full URL requests are posted to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Model used when the call does not override it
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl LLM for ChatClient {
    async fn ask_with(&self, prompt: &str, options: &AskOptions) -> Result<String, LLMError> {
        let model = options.model.as_deref().unwrap_or(&self.model);

        let request = ChatCompletionRequest {
            model,
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        debug!("Sending chat completion request to {} (model {})", self.endpoint, model);

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(|e| {
            let err = classify_transport_error(&e);
            error!("{}", err);
            err
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = classify_status(status, &body);
            error!("{}", err);
            return Err(err);
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            let err = LLMError::Unknown(format!("failed to decode response: {}", e));
            error!("{}", err);
            err
        })?;

        let Some(choice) = completion.choices.into_iter().next() else {
            let err = LLMError::NoChoices {
                model: model.to_string(),
            };
            warn!("{}", err);
            return Err(err);
        };

        match choice.message.and_then(|m| m.content) {
            Some(content) if !content.trim().is_empty() => Ok(content.trim().to_string()),
            _ => {
                warn!("{}", LLMError::EmptyContent);
                Err(LLMError::EmptyContent)
            }
        }
    }
}

/// Map a transport failure (no HTTP status) to a classification
fn classify_transport_error(err: &reqwest::Error) -> LLMError {
    if err.is_connect() || err.is_timeout() {
        LLMError::Connection(err.to_string())
    } else {
        LLMError::Unknown(err.to_string())
    }
}

/// Map a non-success HTTP status to a classification, most specific first
fn classify_status(status: StatusCode, body: &str) -> LLMError {
    let detail = error_detail(status, body);
    match status {
        StatusCode::UNAUTHORIZED => LLMError::Authentication(detail),
        StatusCode::TOO_MANY_REQUESTS => LLMError::RateLimited(detail),
        _ => LLMError::Api {
            status: status.as_u16(),
            detail,
        },
    }
}

/// Best human-readable detail the server gave us.
///
/// Order: top-level `message`, OpenAI `error.message`, DashScope `code`,
/// then a truncated copy of the raw body.
fn error_detail(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
        if let Some(message) = value.pointer("/error/message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
        if let Some(code) = value.get("code") {
            let code = code.as_str().map(str::to_string).unwrap_or_else(|| code.to_string());
            return format!("Code: {}", code);
        }
    }

    let body = body.trim();
    if body.is_empty() {
        return status.canonical_reason().unwrap_or("no details").to_string();
    }
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_from_default_url() {
        let client = ChatClient::with_credential(&Config::default(), Some("k".to_string())).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions"
        );
        assert_eq!(client.model(), "qwen-plus");
        assert!(client.has_credential());
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let config = Config::default().with_api_url("http://localhost:1234/v1/");
        let client = ChatClient::with_credential(&config, None).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:1234/v1/chat/completions");
        assert!(!client.has_credential());
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = Config::default().with_api_url("not a url");
        assert!(ChatClient::with_credential(&config, None).is_err());
    }

    #[test]
    fn test_status_classification_order() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, ""),
            LLMError::Authentication(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
            LLMError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, ""),
            LLMError::Api { status: 502, .. }
        ));
    }

    #[test]
    fn test_error_detail_sources() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(error_detail(status, r#"{"message":"bad model"}"#), "bad model");
        assert_eq!(
            error_detail(status, r#"{"error":{"message":"quota","type":"x"}}"#),
            "quota"
        );
        assert_eq!(
            error_detail(status, r#"{"code":"InvalidParameter"}"#),
            "Code: InvalidParameter"
        );
        assert_eq!(error_detail(status, "plain failure"), "plain failure");
        assert_eq!(error_detail(status, ""), "Bad Request");
    }

    #[test]
    fn test_error_detail_truncates_raw_body() {
        let body = "x".repeat(500);
        assert_eq!(error_detail(StatusCode::INTERNAL_SERVER_ERROR, &body).len(), 200);
    }
}
