//! Ollama LLM Provider
//!
//! Talks to a local Ollama server (`/api/chat` for generation, `/api/tags`
//! for health). No API key is needed and calls cost nothing, so this is the
//! default backend for paper generation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::{FinalAnswer, LLMError, LLMProvider, LLMResponse, Message, Result};
use crate::config::LLMConfig;

/// Per-request HTTP timeout when none is configured
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
    model: String,
    timeout: Duration,
    client: Client,
}

impl OllamaProvider {
    /// Provider for `model` served at `base_url`, with the default timeout.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
            client: http_client(DEFAULT_TIMEOUT),
        }
    }

    /// Provider built from the `[llm]` table, using `local_timeout_secs`.
    pub fn from_config(config: &LLMConfig) -> Self {
        Self::new(config.ollama.base_url.clone(), config.ollama.model.clone())
            .with_timeout(Duration::from_secs(config.local_timeout_secs))
    }

    /// Replace the per-request HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.client = http_client(timeout);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn chat_request<'a>(&'a self, messages: &'a [Message]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|msg| ChatMessage {
                    role: msg.role.to_string(),
                    content: &msg.content,
                })
                .collect(),
            stream: false,
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> LLMError {
        if err.is_timeout() {
            LLMError::Timeout
        } else if err.is_connect() {
            LLMError::ProviderUnavailable(format!(
                "Cannot connect to Ollama at {}. Is Ollama running?",
                self.base_url
            ))
        } else {
            LLMError::NetworkError(err.to_string())
        }
    }
}

fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn is_local(&self) -> bool {
        true
    }

    fn estimated_cost(&self, _tokens: usize) -> f64 {
        0.0
    }

    async fn check_health(&self) -> bool {
        match self.client.get(self.endpoint("tags")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Ollama health check failed: {}", e);
                false
            }
        }
    }

    async fn generate(&self, messages: &[Message]) -> Result<LLMResponse> {
        let request = self.chat_request(messages);
        tracing::debug!(
            model = %self.model,
            messages = request.messages.len(),
            chars = request.messages.iter().map(|m| m.content.len()).sum::<usize>(),
            "Ollama chat request"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint("chat"))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::ProviderUnavailable(format!(
                "Ollama API error ({}): {}",
                status, body
            )));
        }

        let reply: ChatReply = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(format!("Failed to parse Ollama response: {}", e)))?;
        tracing::info!(
            "Ollama replied in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        let content = reply.message.content;
        Ok(match super::parse_tool_calls(&content) {
            Some(tool_call) => LLMResponse::ToolCall(tool_call),
            None => LLMResponse::FinalAnswer(FinalAnswer::new(content)),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: String,
    content: &'a str,
}

/// Only the reply text is read; `done`, timings and the rest are ignored.
#[derive(Debug, Deserialize)]
struct ChatReply {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}
