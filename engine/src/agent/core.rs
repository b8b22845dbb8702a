//! Agent Core
//!
//! Bounded think-act-observe loop used by the weekly question generator:
//!
//! 1. Send the conversation to the router
//! 2. Tool call: dispatch it, append the result, loop
//! 3. Final answer: return it
//!
//! # Limits
//!
//! - `max_iterations` model calls per run
//! - 5MB per tool result or final answer

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

use crate::llm::router::LLMRouter;
use crate::llm::{LLMResponse, Message};
use crate::tools::ToolDispatcher;
use sdk::errors::EngineError;

use super::WorkingMemory;

/// Maximum result size in bytes (5MB)
const MAX_RESULT_SIZE: usize = 5 * 1024 * 1024;

/// What a finished agent run produced.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub answer: String,
    pub iterations: usize,
    pub tool_calls: usize,
    pub provider: String,
    pub duration_ms: u64,
}

pub struct ToolAgent {
    router: Arc<LLMRouter>,
    max_iterations: usize,
}

impl ToolAgent {
    pub fn new(router: Arc<LLMRouter>, max_iterations: usize) -> Self {
        Self {
            router,
            max_iterations: max_iterations.max(1),
        }
    }

    /// Run one conversation to a final answer.
    ///
    /// `system_prompt` is extended with the dispatcher's tool catalogue by
    /// the caller; the loop itself only routes calls.
    pub async fn run(
        &self,
        tools: &dyn ToolDispatcher,
        system_prompt: &str,
        instruction: &str,
    ) -> Result<AgentOutcome, EngineError> {
        let start_time = Instant::now();
        let mut memory = WorkingMemory::new();
        memory.start(system_prompt, instruction);

        let mut tool_calls = 0;

        for iteration in 1..=self.max_iterations {
            debug!("Agent iteration {}/{}", iteration, self.max_iterations);

            let (response, provider) = self.router.call(memory.messages()).await.map_err(|e| {
                error!("LLM call failed: {}", e);
                EngineError::from(e)
            })?;

            match response {
                LLMResponse::ToolCall(tool_call) => {
                    debug!("Tool call: {} ({})", tool_call.name, tool_call.id);
                    tool_calls += 1;

                    // Ollama requires user→assistant→tool ordering
                    memory.add_message(Message::assistant(
                        serde_json::json!({
                            "function": &tool_call.name,
                            "arguments": serde_json::from_str::<serde_json::Value>(&tool_call.arguments)
                                .unwrap_or_default()
                        })
                        .to_string(),
                    ));

                    let tool_result = tools.dispatch(&tool_call.name, &tool_call.arguments).await;
                    check_size(tool_result.len(), "Tool result")?;

                    memory.add_message(Message::tool_result(&tool_result, &tool_call.id));
                }
                LLMResponse::FinalAnswer(answer) => {
                    check_size(answer.content.len(), "Final answer")?;
                    debug!(
                        "Final answer from {} after {} iterations ({} tool calls)",
                        provider, iteration, tool_calls
                    );

                    return Ok(AgentOutcome {
                        answer: answer.content,
                        iterations: iteration,
                        tool_calls,
                        provider,
                        duration_ms: start_time.elapsed().as_millis() as u64,
                    });
                }
            }
        }

        warn!("Agent exceeded max iterations ({})", self.max_iterations);
        Err(EngineError::MaxIterationsExceeded)
    }
}

fn check_size(size: usize, what: &str) -> Result<(), EngineError> {
    if size > MAX_RESULT_SIZE {
        warn!(
            "{} exceeds size limit: {} bytes > {} bytes",
            what, size, MAX_RESULT_SIZE
        );
        return Err(EngineError::ResultSizeExceeded {
            size,
            limit: MAX_RESULT_SIZE,
        });
    }
    Ok(())
}
