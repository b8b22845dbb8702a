pub mod question;

pub use question::QuestionTools;

use async_trait::async_trait;

/// A set of tools the agent loop can call by name.
///
/// Dispatch never fails: errors come back as `ERROR: ...` text so the model
/// can see them and correct itself.
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Tool catalogue appended to the agent's system prompt.
    fn system_prompt(&self) -> String;

    fn available_tool_names(&self) -> Vec<&'static str>;

    async fn dispatch(&self, name: &str, arguments_json: &str) -> String;
}

/// Parse tool arguments, treating an empty string as `{}`.
pub(crate) fn parse_arguments(arguments_json: &str) -> Result<serde_json::Value, String> {
    if arguments_json.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    serde_json::from_str(arguments_json)
        .map_err(|e| format!("ERROR: Failed to parse arguments JSON: {}", e))
}

/// Standard reply for a tool name nobody registered.
pub(crate) fn unknown_tool(name: &str, available: &[&str]) -> String {
    tracing::warn!("Unknown tool requested: {}", name);
    format!(
        "ERROR: Unknown tool '{}'. Available tools: {}",
        name,
        available.join(", ")
    )
}
