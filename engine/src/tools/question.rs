use super::{parse_arguments, unknown_tool, ToolDispatcher};
use crate::conductor::prompts;
use crate::conductor::types::{QuestionCounts, WeekAllocation};
use crate::llm::router::LLMRouter;
use crate::llm::strip_code_fence;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

pub const GENERATE_TOOL: &str = "generate_exam_questions";
pub const QUALITY_TOOL: &str = "check_questions_quality";

/// Question drafting and review tools, bound to one week.
pub struct QuestionTools {
    router: Arc<LLMRouter>,
    week_number: u32,
    topics: Vec<String>,
    assigned: QuestionCounts,
    content: String,
}

impl QuestionTools {
    pub fn new(router: Arc<LLMRouter>, allocation: &WeekAllocation, content: impl Into<String>) -> Self {
        Self {
            router,
            week_number: allocation.week_number,
            topics: allocation.topics.clone(),
            assigned: allocation.assigned,
            content: content.into(),
        }
    }

    async fn generate(&self, args: &Value) -> String {
        let topics = read_topics(args).unwrap_or_else(|| self.topics.clone());
        let counts = QuestionCounts::new(
            read_count(args, &["mcq_count"]).unwrap_or(self.assigned.multiple_choice),
            read_count(args, &["short_answer_count", "essay_count"])
                .unwrap_or(self.assigned.short_answer),
        );
        let content = args
            .get("content")
            .and_then(|v| v.as_str())
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(self.content.as_str());

        let prompt = prompts::generate_questions_prompt(&topics, counts, content);

        match self.router.complete(&prompt).await {
            Ok(reply) => {
                debug!("week{}: drafted {} bytes of questions", self.week_number, reply.len());
                strip_code_fence(&reply).to_string()
            }
            Err(e) => format!("ERROR: {}", e),
        }
    }

    async fn check_quality(&self, args: &Value) -> String {
        let candidate = match args.get("questions_json").or_else(|| args.get("questions")) {
            Some(Value::String(text)) => serde_json::from_str::<Value>(strip_code_fence(text)).ok(),
            Some(value @ (Value::Object(_) | Value::Array(_))) => Some(value.clone()),
            _ => None,
        };

        let Some(candidate) = candidate else {
            info!("week{}: quality check rejected malformed draft", self.week_number);
            return prompts::QUALITY_FORMAT_ERROR.to_string();
        };

        let week_number = read_count(args, &["week_number"]).unwrap_or(self.week_number);
        let topics = read_topics(args).unwrap_or_else(|| self.topics.clone());
        let counts = QuestionCounts::new(
            read_count(args, &["mcq_count"]).unwrap_or(self.assigned.multiple_choice),
            read_count(args, &["short_answer_count", "essay_count"])
                .unwrap_or(self.assigned.short_answer),
        );

        let prompt =
            prompts::quality_check_prompt(&candidate.to_string(), week_number, &topics, counts);

        match self.router.complete(&prompt).await {
            Ok(review) => review,
            Err(e) => format!("ERROR: {}", e),
        }
    }
}

fn read_topics(args: &Value) -> Option<Vec<String>> {
    let topics: Vec<String> = args
        .get("topics")?
        .as_array()?
        .iter()
        .filter_map(|t| t.as_str().map(String::from))
        .collect();
    if topics.is_empty() {
        None
    } else {
        Some(topics)
    }
}

fn read_count(args: &Value, keys: &[&str]) -> Option<u32> {
    keys.iter()
        .find_map(|key| args.get(*key))
        .and_then(|v| v.as_u64())
        .and_then(|n| u32::try_from(n).ok())
}

#[async_trait]
impl ToolDispatcher for QuestionTools {
    fn system_prompt(&self) -> String {
        [
            format!("## {}", GENERATE_TOOL),
            "Draft this week's questions from the lecture material. Returns question set JSON."
                .to_string(),
            r#"Arguments: {"topics": ["..."], "mcq_count": 2, "short_answer_count": 1, "content": "..."}"#
                .to_string(),
            String::new(),
            format!("## {}", QUALITY_TOOL),
            "Review a drafted question set. Returns PASS or FAIL with the problems found."
                .to_string(),
            r#"Arguments: {"questions_json": "<question set JSON>", "week_number": 1, "topics": ["..."], "mcq_count": 2, "short_answer_count": 1}"#
                .to_string(),
        ]
        .join("\n")
    }

    fn available_tool_names(&self) -> Vec<&'static str> {
        vec![GENERATE_TOOL, QUALITY_TOOL]
    }

    async fn dispatch(&self, name: &str, arguments_json: &str) -> String {
        debug!("Dispatching tool '{}' with args: {}", name, arguments_json);

        let args = match parse_arguments(arguments_json) {
            Ok(args) => args,
            Err(message) => return message,
        };

        match name {
            GENERATE_TOOL => self.generate(&args).await,
            QUALITY_TOOL => self.check_quality(&args).await,
            _ => unknown_tool(name, &self.available_tool_names()),
        }
    }
}
