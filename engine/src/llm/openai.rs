//! OpenAI-compatible chat completions provider
//!
//! Requests JSON-mode output at the configured temperature (0 by default) so
//! the intent extractor gets a single object back.

use super::{GenerationOptions, LLMError, LLMProvider, Message};
use crate::config::OpenAIConfig;
use crate::secrets::{scrub, SecretString};
use async_trait::async_trait;
use serde_json::json;

pub struct OpenAIProvider {
    config: OpenAIConfig,
    api_key: SecretString,
    options: GenerationOptions,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig, api_key: SecretString, options: GenerationOptions) -> Self {
        let client = super::http_client(options.timeout);

        Self {
            config,
            api_key,
            options,
            client,
        }
    }

    fn build_payload(&self, messages: &[Message]) -> serde_json::Value {
        let api_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.to_string(),
                    "content": msg.content
                })
            })
            .collect();

        json!({
            "model": self.config.model,
            "messages": api_messages,
            "temperature": self.options.temperature,
            "response_format": { "type": "json_object" },
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn check_health(&self) -> bool {
        !self.api_key.unsecure().is_empty()
    }

    async fn generate(&self, messages: &[Message]) -> super::Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let payload = self.build_payload(messages);

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.unsecure()))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| LLMError::from_reqwest(e, &self.config.base_url))?;

        tracing::debug!(
            "OpenAI response received in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        if !response.status().is_success() {
            let status = response.status();
            let text = scrub(&response.text().await.unwrap_or_default());

            return Err(match status.as_u16() {
                401 | 403 => LLMError::AuthenticationFailed(text),
                429 => LLMError::RateLimitExceeded,
                s if s >= 500 => {
                    LLMError::ProviderUnavailable(format!("OpenAI API error ({}): {}", status, text))
                }
                _ => LLMError::InvalidRequest(text),
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let choice = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| LLMError::ParseError("No choices in response".to_string()))?;

        let message = choice
            .get("message")
            .ok_or_else(|| LLMError::ParseError("No message in choice".to_string()))?;

        match message.get("content").and_then(|c| c.as_str()) {
            Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
            _ => Err(LLMError::ParseError("Empty content".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAIProvider {
        OpenAIProvider::new(
            OpenAIConfig::default(),
            SecretString::from("sk-test"),
            GenerationOptions::default(),
        )
    }

    #[test]
    fn test_openai_provider_properties() {
        let provider = provider();
        assert_eq!(provider.name(), "openai");
        assert!(!provider.is_local());
    }

    #[test]
    fn test_payload_requests_json_mode() {
        let provider = provider();
        let payload = provider.build_payload(&[
            Message::system("extract"),
            Message::user("aula de Cálculo amanhã"),
        ]);

        assert_eq!(payload["model"], "gpt-4o-mini");
        assert_eq!(payload["temperature"], 0.0);
        assert_eq!(payload["response_format"]["type"], "json_object");
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["content"], "aula de Cálculo amanhã");
    }
}
