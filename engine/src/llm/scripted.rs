//! Scripted provider for unit tests.

use super::router::LLMRouter;
use super::{parse_tool_calls, FinalAnswer, LLMError, LLMProvider, LLMResponse, Message, Result};
use crate::config::LLMConfig;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Handler = dyn Fn(&[Message]) -> Result<LLMResponse> + Send + Sync;

pub(crate) struct ScriptedProvider {
    name: String,
    handler: Box<Handler>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub(crate) fn new(
        name: &str,
        handler: impl Fn(&[Message]) -> Result<LLMResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            handler: Box::new(handler),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answers every request with the same text.
    pub(crate) fn always(name: &str, text: &str) -> Self {
        let text = text.to_string();
        Self::new(name, move |_| reply(&text))
    }

    /// Fails every request.
    pub(crate) fn failing(name: &str) -> Self {
        Self::new(name, |_| {
            Err(LLMError::ProviderUnavailable("scripted outage".to_string()))
        })
    }

    pub(crate) fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

/// Shape raw model text the way a real provider would.
pub(crate) fn reply(text: &str) -> Result<LLMResponse> {
    Ok(match parse_tool_calls(text) {
        Some(call) => LLMResponse::ToolCall(call),
        None => LLMResponse::FinalAnswer(FinalAnswer::new(text)),
    })
}

/// Wrap a single provider in a router with short timeouts.
pub(crate) fn router_with(provider: ScriptedProvider) -> Arc<LLMRouter> {
    let config = LLMConfig {
        default_provider: provider.name.clone(),
        local_timeout_secs: 5,
        cloud_timeout_secs: 5,
        ollama: Default::default(),
        openai: Default::default(),
    };
    Arc::new(LLMRouter::new(vec![Box::new(provider)], Arc::new(config)))
}

/// Text of the most recent user or tool message.
pub(crate) fn last_content(messages: &[Message]) -> &str {
    messages.last().map(|m| m.content.as_str()).unwrap_or("")
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_local(&self) -> bool {
        true
    }

    fn estimated_cost(&self, _tokens: usize) -> f64 {
        0.0
    }

    async fn generate(&self, messages: &[Message]) -> Result<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.handler)(messages)
    }
}
