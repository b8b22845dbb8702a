use super::{LLMError, LLMProvider, LLMResponse, Message};
use crate::config::OpenAIConfig;
use async_trait::async_trait;
use serde_json::json;

pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Whether the configured API key variable is set and non-empty.
    pub fn has_api_key(config: &OpenAIConfig) -> bool {
        std::env::var(&config.api_key_env)
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }

    fn api_key(&self) -> super::Result<String> {
        std::env::var(&self.config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                LLMError::AuthenticationFailed(format!(
                    "environment variable {} is not set",
                    self.config.api_key_env
                ))
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

    fn estimated_cost(&self, tokens: usize) -> f64 {
        // Approx $0.005 per 1k tokens for gpt-4o input
        (tokens as f64 / 1000.0) * 0.005
    }

    async fn check_health(&self) -> bool {
        self.api_key().is_ok()
    }

    async fn generate(&self, messages: &[Message]) -> super::Result<LLMResponse> {
        let api_key = self.api_key()?;

        let url = format!("{}/chat/completions", self.config.base_url);

        // The chat API only accepts tool-role messages that answer native tool
        // calls, so our text protocol replays tool output as user turns.
        let api_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    super::MessageRole::Tool => "user".to_string(),
                    other => other.to_string(),
                };
                json!({
                    "role": role,
                    "content": msg.content
                })
            })
            .collect();

        let payload = json!({
            "model": self.config.model,
            "messages": api_messages,
            "temperature": self.config.temperature,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else {
                    LLMError::NetworkError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(LLMError::AuthenticationFailed(text));
            } else if status.as_u16() == 429 {
                return Err(LLMError::RateLimitExceeded);
            } else {
                return Err(LLMError::InvalidRequest(text));
            }
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

        if let Some(content) = message.get("content").and_then(|c| c.as_str()) {
            if let Some(tool_call) = super::parse_tool_calls(content) {
                return Ok(LLMResponse::ToolCall(tool_call));
            }
            Ok(LLMResponse::FinalAnswer(super::FinalAnswer::new(content)))
        } else {
            Err(LLMError::ParseError("Empty content".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_env(var: &str) -> OpenAIConfig {
        OpenAIConfig {
            api_key_env: var.to_string(),
            ..OpenAIConfig::default()
        }
    }

    #[test]
    fn test_openai_provider_properties() {
        let provider = OpenAIProvider::new(OpenAIConfig::default());
        assert_eq!(provider.name(), "openai");
        assert!(!provider.is_local());
        assert!(provider.estimated_cost(1000) > 0.0);
    }

    #[tokio::test]
    async fn test_missing_key_is_an_auth_failure() {
        let config = config_with_env("EXAMFORGE_TEST_KEY_THAT_IS_NEVER_SET");
        assert!(!OpenAIProvider::has_api_key(&config));

        let provider = OpenAIProvider::new(config);
        assert!(!provider.check_health().await);

        let result = provider.generate(&[Message::user("hi")]).await;
        assert!(matches!(result, Err(LLMError::AuthenticationFailed(_))));
    }
}
