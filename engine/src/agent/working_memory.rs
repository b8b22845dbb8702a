//! Working Memory for the Agent Loop
//!
//! Holds one conversation. The first messages (system prompt and the week's
//! instruction) are pinned; once the estimate passes the context limit the
//! oldest tool exchanges after them are dropped, newest kept.

use crate::llm::Message;

/// Default context limit in tokens
const DEFAULT_CONTEXT_LIMIT: usize = 16_000;

/// Rough estimate: 1 token ≈ 4 characters
const CHARS_PER_TOKEN: usize = 4;

/// Per-message overhead for role and framing
const MESSAGE_OVERHEAD_TOKENS: usize = 10;

#[derive(Debug, Clone)]
pub struct WorkingMemory {
    messages: Vec<Message>,
    pinned: usize,
    context_limit: usize,
    token_count: usize,
}

impl WorkingMemory {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_CONTEXT_LIMIT)
    }

    pub fn with_limit(context_limit: usize) -> Self {
        Self {
            messages: Vec::new(),
            pinned: 0,
            context_limit,
            token_count: 0,
        }
    }

    /// Start a conversation from its system prompt and task; both stay pinned.
    pub fn start(&mut self, system_prompt: &str, instruction: &str) {
        self.messages.clear();
        self.token_count = 0;
        self.push(Message::system(system_prompt));
        self.push(Message::user(instruction));
        self.pinned = self.messages.len();
    }

    /// Append a message, trimming old unpinned ones if over the limit.
    pub fn add_message(&mut self, message: Message) {
        self.push(message);
        if self.token_count > self.context_limit {
            self.trim();
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    fn push(&mut self, message: Message) {
        self.token_count += Self::estimate_tokens(&message);
        self.messages.push(message);
    }

    /// Drop from the front of the unpinned tail, always keeping its last two
    /// messages so the latest tool call and result survive.
    fn trim(&mut self) {
        while self.token_count > self.context_limit && self.messages.len() > self.pinned + 2 {
            let removed = self.messages.remove(self.pinned);
            self.token_count = self
                .token_count
                .saturating_sub(Self::estimate_tokens(&removed));
        }
    }

    fn estimate_tokens(message: &Message) -> usize {
        let chars = message.content.len()
            + message.tool_call_id.as_ref().map(|id| id.len()).unwrap_or(0);
        chars.div_ceil(CHARS_PER_TOKEN) + MESSAGE_OVERHEAD_TOKENS
    }
}

impl Default for WorkingMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageRole;

    #[test]
    fn test_start_pins_head() {
        let mut memory = WorkingMemory::new();
        memory.start("system", "week 1 task");
        assert_eq!(memory.messages().len(), 2);
        assert_eq!(memory.messages()[0].role, MessageRole::System);
        assert_eq!(memory.messages()[1].role, MessageRole::User);
        assert!(memory.token_count() > 0);
    }

    #[test]
    fn test_restart_clears_previous_run() {
        let mut memory = WorkingMemory::new();
        memory.start("system", "first");
        memory.add_message(Message::assistant("call"));
        memory.start("system", "second");
        assert_eq!(memory.messages().len(), 2);
        assert_eq!(memory.messages()[1].content, "second");
    }

    #[test]
    fn test_trim_keeps_pinned_and_latest() {
        let mut memory = WorkingMemory::with_limit(60);
        memory.start("system", "task");
        for i in 0..10 {
            memory.add_message(Message::assistant(format!("call {} {}", i, "x".repeat(40))));
            memory.add_message(Message::tool_result(format!("result {}", i), format!("c{}", i)));
        }

        let messages = memory.messages();
        assert_eq!(messages[0].content, "system");
        assert_eq!(messages[1].content, "task");
        assert_eq!(messages.last().map(|m| m.content.as_str()), Some("result 9"));
        assert!(messages.len() < 22);
    }
}
