//! LLM Router
//!
//! Picks which configured provider serves a request and fails over to the
//! next one when a call errors or runs past its time budget. Every LLM call in
//! the pipeline (budget planning, question generation, quality review,
//! lecture summaries) goes through here.

use super::{LLMError, LLMProvider, LLMResponse, Message};
use crate::config::LLMConfig;
use std::sync::Arc;
use std::time::Duration;

/// Prompts above this estimate favour cloud providers with larger context windows.
const LARGE_PROMPT_TOKENS: usize = 4000;

/// LLM Router that ranks providers and calls them with failover
pub struct LLMRouter {
    /// Available LLM providers
    providers: Vec<Box<dyn LLMProvider>>,

    /// LLM configuration
    config: Arc<LLMConfig>,
}

impl LLMRouter {
    /// Create a new LLM router
    ///
    /// # Arguments
    /// * `providers` - List of available LLM providers
    /// * `config` - LLM configuration
    pub fn new(providers: Vec<Box<dyn LLMProvider>>, config: Arc<LLMConfig>) -> Self {
        Self { providers, config }
    }

    /// Number of registered providers
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Estimate token count for the conversation
    ///
    /// Uses a simple heuristic: ~4 characters per token
    pub fn estimate_tokens(&self, messages: &[Message]) -> usize {
        let total_chars: usize = messages.iter().map(|m| m.content.len()).sum();
        total_chars / 4
    }

    /// Rank providers for a request of the given size
    ///
    /// Ranking:
    /// 1. The configured default provider
    /// 2. Cloud providers for prompts above `LARGE_PROMPT_TOKENS`
    /// 3. Cheaper providers
    ///
    /// Ties keep registration order.
    pub fn rank_providers(&self, estimated_tokens: usize) -> Vec<&dyn LLMProvider> {
        let mut providers: Vec<&dyn LLMProvider> =
            self.providers.iter().map(|b| b.as_ref()).collect();

        let default_provider = &self.config.default_provider;

        let score = |p: &dyn LLMProvider| {
            let mut score = 0.0_f64;
            if p.name() == default_provider {
                score += 200.0;
            }
            if estimated_tokens > LARGE_PROMPT_TOKENS && !p.is_local() {
                score += 50.0;
            }
            score - p.estimated_cost(estimated_tokens) * 1000.0
        };

        providers.sort_by(|a, b| {
            score(*b)
                .partial_cmp(&score(*a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        providers
    }

    fn timeout_for(&self, provider: &dyn LLMProvider) -> Duration {
        if provider.is_local() {
            Duration::from_secs(self.config.local_timeout_secs)
        } else {
            Duration::from_secs(self.config.cloud_timeout_secs)
        }
    }

    /// Call LLM providers with automatic failover
    ///
    /// Providers are tried in ranked order, each under its own timeout.
    /// Returns the response together with the name of the provider that
    /// produced it.
    pub async fn call(&self, messages: &[Message]) -> super::Result<(LLMResponse, String)> {
        if self.providers.is_empty() {
            return Err(LLMError::ProviderUnavailable(
                "No LLM providers configured".to_string(),
            ));
        }

        let estimated_tokens = self.estimate_tokens(messages);
        let ranked_providers = self.rank_providers(estimated_tokens);

        for provider in ranked_providers {
            let budget = self.timeout_for(provider);
            tracing::debug!(
                "Attempting provider: {} (timeout: {}s, ~{} tokens)",
                provider.name(),
                budget.as_secs(),
                estimated_tokens
            );

            let result = tokio::time::timeout(budget, provider.generate(messages)).await;

            match result {
                Ok(Ok(response)) => {
                    tracing::debug!("Provider {} succeeded", provider.name());
                    return Ok((response, provider.name().to_string()));
                }
                Ok(Err(e)) => {
                    tracing::warn!("Provider {} failed: {}", provider.name(), e);
                }
                Err(_) => {
                    tracing::warn!(
                        "Provider {} timed out after {}s",
                        provider.name(),
                        budget.as_secs()
                    );
                }
            }
        }

        tracing::error!("All LLM providers exhausted");
        Err(LLMError::ProviderUnavailable(
            "All LLM providers failed".to_string(),
        ))
    }

    /// Single-turn text completion.
    ///
    /// Sends `prompt` as the only user message and returns the reply text.
    pub async fn complete(&self, prompt: &str) -> super::Result<String> {
        let (response, provider) = self.call(&[Message::user(prompt)]).await?;
        tracing::trace!("Completion served by {}", provider);
        Ok(response.into_text())
    }

    /// Check the health of all registered providers
    /// Returns a list of (provider_name, is_healthy)
    pub async fn check_health(&self) -> Vec<(&str, bool)> {
        let mut results = Vec::new();
        for provider in &self.providers {
            let is_healthy = provider.check_health().await;
            results.push((provider.name(), is_healthy));
        }
        results
    }
}
