//! LLM Provider Abstraction Layer
//!
//! This module provides a common interface for the language-understanding
//! backends Aula can use for intent extraction (OpenAI-compatible APIs and
//! Ollama). The `LLMProvider` trait is the whole contract: messages in, raw
//! completion text out. Interpreting that text is the intent extractor's job.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::LLMConfig;
use crate::secrets::SecretString;
use sdk::errors::EngineError;

pub mod ollama;
pub mod openai;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl LLMError {
    /// True when the provider could not be reached or refused to serve us,
    /// as opposed to answering with something unusable.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            LLMError::ProviderUnavailable(_)
                | LLMError::AuthenticationFailed(_)
                | LLMError::RateLimitExceeded
                | LLMError::NetworkError(_)
                | LLMError::Timeout
        )
    }

    pub(crate) fn from_reqwest(e: reqwest::Error, base_url: &str) -> Self {
        if e.is_timeout() {
            LLMError::Timeout
        } else if e.is_connect() {
            LLMError::ProviderUnavailable(format!("Cannot connect to {}", base_url))
        } else {
            LLMError::NetworkError(crate::secrets::scrub(&e.to_string()))
        }
    }
}

/// Message in a prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// Sampling and transport options shared by all providers
#[derive(Debug, Clone, Copy)]
pub struct GenerationOptions {
    pub temperature: f64,
    pub timeout: Duration,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&LLMConfig> for GenerationOptions {
    fn from(config: &LLMConfig) -> Self {
        Self {
            temperature: config.temperature,
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// Build the HTTP client shared by the providers.
///
/// A builder failure leaves us with reqwest's default client, which has no
/// request timeout, so it is logged.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(
                "Failed to build HTTP client with a {}s timeout, using defaults: {}",
                timeout.as_secs(),
                e
            );
            reqwest::Client::new()
        })
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "ollama", "openai")
    fn name(&self) -> &str;

    /// Returns true if this is a local provider (e.g., Ollama)
    fn is_local(&self) -> bool;

    /// Send one prompt and return the completion text
    ///
    /// Exactly one HTTP round trip; no retries.
    async fn generate(&self, messages: &[Message]) -> Result<String>;

    /// Check if the provider is currently healthy and available
    async fn check_health(&self) -> bool {
        true
    }
}

/// Build the provider named by `llm.default_provider`.
///
/// The API key is passed in explicitly; providers never read credentials
/// from the environment themselves.
pub fn build_provider(
    config: &LLMConfig,
    openai_api_key: Option<SecretString>,
) -> std::result::Result<Box<dyn LLMProvider>, EngineError> {
    let options = GenerationOptions::from(config);

    match config.default_provider.as_str() {
        "openai" => {
            let api_key = openai_api_key.ok_or_else(|| {
                EngineError::Config(format!(
                    "No OpenAI API key found. Set ${} or store 'openai_api_key' in the keychain",
                    config.openai.api_key_env
                ))
            })?;
            Ok(Box::new(openai::OpenAIProvider::new(
                config.openai.clone(),
                api_key,
                options,
            )))
        }
        "ollama" => Ok(Box::new(ollama::OllamaProvider::with_options(
            config.ollama.base_url.clone(),
            config.ollama.model.clone(),
            options,
        ))),
        other => Err(EngineError::Config(format!(
            "Unknown LLM provider '{}'",
            other
        ))),
    }
}

/// Locate the JSON object in a completion.
///
/// Handles multiple LLM output formats:
/// 1. Raw JSON: `{"intent": ...}`
/// 2. Fenced JSON (with or without trailing text): ` ```json\n{...}\n``` `
/// 3. JSON embedded in prose, found by scanning for the first `{`
pub fn extract_json_object(content: &str) -> Option<&str> {
    let trimmed = content.trim();

    if let Some(json) = extract_balanced_json(trimmed) {
        return Some(json);
    }

    if let Some(inner) = extract_fenced_json(trimmed) {
        if let Some(json) = extract_balanced_json(inner.trim()) {
            return Some(json);
        }
    }

    let pos = trimmed.find('{')?;
    extract_balanced_json(&trimmed[pos..])
}

/// Extract the body of the first markdown code fence in the text.
///
/// Works even when there is trailing prose after the closing ```.
fn extract_fenced_json(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start_rel = after_opening.find('\n')? + 1;
    let body_start = fence_start + 3 + body_start_rel;

    let closing = content[body_start..].find("```")?;
    let body_end = body_start + closing;

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts `{` / `}` depth, respecting string literals, to find the
/// matching close brace.
fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let user_msg = Message::user("Hello");
        assert_eq!(user_msg.role, MessageRole::User);
        assert_eq!(user_msg.content, "Hello");

        let system_msg = Message::system("You are a helpful assistant");
        assert_eq!(system_msg.role, MessageRole::System);
        assert_eq!(system_msg.role.to_string(), "system");
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::user("test");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""role":"user""#));
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, deserialized);
    }

    #[test]
    fn test_extract_raw_json() {
        let content = r#"  {"intent": "lookup_by_subject", "subject": "Cálculo"}  "#;
        assert_eq!(
            extract_json_object(content),
            Some(r#"{"intent": "lookup_by_subject", "subject": "Cálculo"}"#)
        );
    }

    #[test]
    fn test_extract_fenced_json_with_trailing_text() {
        let content = "```json\n{\"room\": \"203\"}\n```\nHope this helps!";
        assert_eq!(extract_json_object(content), Some("{\"room\": \"203\"}"));
    }

    #[test]
    fn test_extract_json_in_prose_respects_strings() {
        let content = r#"Sure: {"subject": "a } b", "room": ""} done"#;
        assert_eq!(
            extract_json_object(content),
            Some(r#"{"subject": "a } b", "room": ""}"#)
        );
    }

    #[test]
    fn test_extract_json_none() {
        assert_eq!(extract_json_object("I don't know"), None);
        assert_eq!(extract_json_object("{\"unterminated\": 1"), None);
    }

    #[test]
    fn test_connectivity_classification() {
        assert!(LLMError::Timeout.is_connectivity());
        assert!(LLMError::RateLimitExceeded.is_connectivity());
        assert!(!LLMError::ParseError("x".into()).is_connectivity());
        assert!(!LLMError::InvalidRequest("x".into()).is_connectivity());
    }

    #[test]
    fn test_generation_options_from_config() {
        let config = LLMConfig {
            request_timeout_secs: 5,
            temperature: 0.3,
            ..LLMConfig::default()
        };
        let options = GenerationOptions::from(&config);
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.temperature, 0.3);

        // Builds with the configured timeout, no fallback needed
        let _client = http_client(options.timeout);
    }

    #[test]
    fn test_build_openai_requires_key() {
        let config = LLMConfig::default();
        let result = build_provider(&config, None);
        assert!(matches!(result, Err(EngineError::Config(_))));

        let provider = build_provider(&config, Some(SecretString::from("sk-test"))).unwrap();
        assert_eq!(provider.name(), "openai");
        assert!(!provider.is_local());
    }

    #[test]
    fn test_build_ollama_needs_no_key() {
        let config = LLMConfig {
            default_provider: "ollama".to_string(),
            ..LLMConfig::default()
        };
        let provider = build_provider(&config, None).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert!(provider.is_local());
    }
}
