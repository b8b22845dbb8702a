//! Weekly Question Generator
//!
//! Runs one tool-using agent per week and turns its final answer into
//! `GeneratedQuestion`s. Whatever goes wrong (provider outage, iteration
//! ceiling, unreadable JSON) the week still leaves with exactly its assigned
//! number of questions; the missing ones are placeholders.

use super::prompts;
use super::types::{GeneratedQuestion, QuestionKind, RawOption, WeekAllocation, WeekContentSource};
use crate::agent::ToolAgent;
use crate::llm::router::LLMRouter;
use crate::llm::strip_code_fence;
use crate::tools::{QuestionTools, ToolDispatcher};
use sdk::errors::EngineError;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

const MCQ_LIST_KEYS: &[&str] = &["multiple_choice", "multipleChoice", "mcq"];
const SHORT_LIST_KEYS: &[&str] = &["short_answer", "short-answer", "shortAnswer", "essay"];

#[derive(Debug, thiserror::Error)]
pub enum QuestionParseError {
    #[error("agent run failed: {0}")]
    Agent(#[from] EngineError),

    #[error("final answer is not JSON: {0}")]
    InvalidJson(String),

    #[error("final answer is not a JSON object")]
    NotAnObject,

    #[error("final answer has neither a multiple choice nor a short answer list")]
    MissingLists,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawMcq {
    pub question: String,
    pub options: Vec<RawOption>,
    pub answer: String,
    pub hint: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawShortAnswer {
    pub question: String,
    pub answer: String,
    pub hint: String,
}

/// The agent's final answer, with legacy field names already resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQuestionSet {
    pub multiple_choice: Vec<RawMcq>,
    pub short_answer: Vec<RawShortAnswer>,
}

pub struct WeeklyQuestionGenerator {
    router: Arc<LLMRouter>,
    max_iterations: usize,
    content_preview_chars: usize,
}

impl WeeklyQuestionGenerator {
    pub fn new(router: Arc<LLMRouter>, max_iterations: usize, content_preview_chars: usize) -> Self {
        Self {
            router,
            max_iterations,
            content_preview_chars,
        }
    }

    /// Populate `allocation.generated_questions`. Never fails.
    pub async fn generate(
        &self,
        mut allocation: WeekAllocation,
        content: &dyn WeekContentSource,
    ) -> WeekAllocation {
        let preview = content_preview(
            content.week_content(allocation.week_number).unwrap_or_default(),
            self.content_preview_chars,
        );

        let questions = match self.attempt(&allocation, &preview).await {
            Ok(set) => reconcile(&allocation, set),
            Err(e) => {
                warn!(
                    "week{}: generation failed ({}), using placeholder questions",
                    allocation.week_number, e
                );
                placeholder_questions(&allocation)
            }
        };

        info!(
            "week{}: {} questions ready",
            allocation.week_number,
            questions.len()
        );
        allocation.generated_questions = questions;
        debug_assert!(
            allocation.is_complete(),
            "week{} questions do not match its budget",
            allocation.week_number
        );
        allocation
    }

    async fn attempt(
        &self,
        allocation: &WeekAllocation,
        preview: &str,
    ) -> Result<RawQuestionSet, QuestionParseError> {
        let tools = QuestionTools::new(Arc::clone(&self.router), allocation, preview);
        let agent = ToolAgent::new(Arc::clone(&self.router), self.max_iterations);

        let outcome = agent
            .run(
                &tools,
                &prompts::weekly_system_prompt(&tools.system_prompt()),
                &prompts::weekly_instruction(allocation, preview),
            )
            .await?;

        debug!(
            "week{}: agent finished via {} in {} iterations ({} tool calls, {}ms)",
            allocation.week_number,
            outcome.provider,
            outcome.iterations,
            outcome.tool_calls,
            outcome.duration_ms
        );

        parse_question_set(&outcome.answer)
    }
}

/// First `max_chars` characters of the week's lecture text.
pub fn content_preview(content: &str, max_chars: usize) -> String {
    content.chars().take(max_chars).collect()
}

/// Parse the agent's final answer.
///
/// A surrounding code fence is stripped first. Items that are not objects
/// are skipped; reconciliation pads for them later.
pub fn parse_question_set(text: &str) -> Result<RawQuestionSet, QuestionParseError> {
    let value: Value = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| QuestionParseError::InvalidJson(e.to_string()))?;
    let Value::Object(root) = value else {
        return Err(QuestionParseError::NotAnObject);
    };

    let mcq_items = find_list(&root, MCQ_LIST_KEYS);
    let short_items = find_list(&root, SHORT_LIST_KEYS);
    if mcq_items.is_none() && short_items.is_none() {
        return Err(QuestionParseError::MissingLists);
    }

    let multiple_choice = mcq_items
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .map(|item| RawMcq {
            question: text_field(item, &["question"]),
            options: item
                .get("options")
                .and_then(Value::as_array)
                .map(|opts| opts.iter().cloned().map(RawOption::from_value).collect())
                .unwrap_or_default(),
            answer: text_field(item, &["answer"]),
            hint: text_field(item, &["hint", "explanation"]),
        })
        .collect();

    let short_answer = short_items
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .map(|item| RawShortAnswer {
            question: text_field(item, &["question"]),
            answer: text_field(item, &["answer"]),
            hint: text_field(item, &["hint", "explanation"]),
        })
        .collect();

    Ok(RawQuestionSet {
        multiple_choice,
        short_answer,
    })
}

fn find_list<'a>(root: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|key| root.get(*key).and_then(Value::as_array))
}

/// First present key under `keys`, as text; numbers are stringified.
fn text_field(item: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| match item.get(*key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Fit a parsed set to the week's budget: extras are dropped, gaps padded.
pub fn reconcile(allocation: &WeekAllocation, set: RawQuestionSet) -> Vec<GeneratedQuestion> {
    let week = allocation.week_number;
    let wanted_mcq = allocation.assigned.multiple_choice as usize;
    let wanted_short = allocation.assigned.short_answer as usize;

    if set.multiple_choice.len() != wanted_mcq || set.short_answer.len() != wanted_short {
        warn!(
            "week{}: got {} multiple choice and {} short answer, assigned {} and {}; reconciling",
            week,
            set.multiple_choice.len(),
            set.short_answer.len(),
            wanted_mcq,
            wanted_short
        );
    }

    let mut questions = Vec::with_capacity(wanted_mcq.saturating_add(wanted_short));

    let mut mcqs = set.multiple_choice.into_iter();
    for i in 1..=wanted_mcq {
        questions.push(match mcqs.next() {
            Some(raw) => GeneratedQuestion {
                text: format!("[Week{}] multiple choice question #{}: {}", week, i, raw.question),
                kind: QuestionKind::MultipleChoice,
                answer: raw.answer,
                hint: raw.hint,
                options: raw.options,
                resource_link: String::new(),
            },
            None => placeholder_mcq(week, &allocation.topics, i),
        });
    }

    let mut shorts = set.short_answer.into_iter();
    for i in 1..=wanted_short {
        questions.push(match shorts.next() {
            Some(raw) => GeneratedQuestion {
                text: format!("[Week{}] short answer question #{}: {}", week, i, raw.question),
                kind: QuestionKind::ShortAnswer,
                answer: raw.answer,
                hint: raw.hint,
                options: Vec::new(),
                resource_link: String::new(),
            },
            None => placeholder_short_answer(week, &allocation.topics, i),
        });
    }

    questions
}

/// A full week of placeholders, multiple choice first.
pub fn placeholder_questions(allocation: &WeekAllocation) -> Vec<GeneratedQuestion> {
    reconcile(allocation, RawQuestionSet::default())
}

fn placeholder_mcq(week: u32, topics: &[String], index: usize) -> GeneratedQuestion {
    GeneratedQuestion {
        text: format!(
            "[Week{}] multiple choice question #{}: about {}",
            week,
            index,
            topics.join("/")
        ),
        kind: QuestionKind::MultipleChoice,
        answer: "A".to_string(),
        hint: "none".to_string(),
        options: (1..=4)
            .zip(['A', 'B', 'C', 'D'])
            .map(|(n, letter)| RawOption::Plain(format!("{}. option{}", letter, n)))
            .collect(),
        resource_link: String::new(),
    }
}

fn placeholder_short_answer(week: u32, topics: &[String], index: usize) -> GeneratedQuestion {
    let topics = topics.join("/");
    GeneratedQuestion {
        text: format!(
            "[Week{}] short answer question #{}: please discuss the importance of {}",
            week, index, topics
        ),
        kind: QuestionKind::ShortAnswer,
        answer: format!("reference answer about {}", topics),
        hint: String::new(),
        options: Vec::new(),
        resource_link: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conductor::types::QuestionCounts;
    use crate::llm::scripted::{router_with, ScriptedProvider};
    use serde_json::json;

    struct NoContent;

    impl WeekContentSource for NoContent {
        fn week_content(&self, _week_number: u32) -> Option<&str> {
            None
        }
    }

    fn allocation(mcq: u32, short: u32) -> WeekAllocation {
        WeekAllocation::new(
            1,
            vec!["Loops".to_string(), "Arrays".to_string()],
            QuestionCounts::new(mcq, short),
        )
    }

    #[test]
    fn test_parse_fenced_current_schema() {
        let text = r#"```json
{"multiple_choice": [{"question": "What is a loop?", "options": ["A. x", {"option": "B. y", "explanation": "why"}], "answer": "B", "hint": "repeat"}],
 "short_answer": [{"question": "Explain arrays", "answer": "contiguous memory", "hint": "memory"}]}
```"#;
        let set = parse_question_set(text).unwrap();

        assert_eq!(set.multiple_choice.len(), 1);
        assert_eq!(set.multiple_choice[0].answer, "B");
        assert_eq!(set.multiple_choice[0].options.len(), 2);
        assert_eq!(set.short_answer[0].answer, "contiguous memory");
    }

    #[test]
    fn test_parse_legacy_names() {
        let text = json!({
            "mcq": [{"question": "Q", "options": [], "answer": 2, "explanation": "legacy hint"}],
            "essay": [{"question": "E", "answer": "R"}]
        })
        .to_string();
        let set = parse_question_set(&text).unwrap();

        assert_eq!(set.multiple_choice[0].answer, "2");
        assert_eq!(set.multiple_choice[0].hint, "legacy hint");
        assert_eq!(set.short_answer[0].question, "E");
        assert_eq!(set.short_answer[0].hint, "");
    }

    #[test]
    fn test_parse_rejects_unusable_answers() {
        assert!(matches!(
            parse_question_set("Here are your questions!"),
            Err(QuestionParseError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_question_set("[1, 2]"),
            Err(QuestionParseError::NotAnObject)
        ));
        assert!(matches!(
            parse_question_set(r#"{"questions": []}"#),
            Err(QuestionParseError::MissingLists)
        ));
    }

    #[test]
    fn test_parse_skips_non_object_items() {
        let set = parse_question_set(r#"{"multiple_choice": ["oops", {"question": "Q"}]}"#).unwrap();
        assert_eq!(set.multiple_choice.len(), 1);
        assert!(set.short_answer.is_empty());
    }

    #[test]
    fn test_placeholders_match_budget() {
        let questions = placeholder_questions(&allocation(2, 1));

        assert_eq!(questions.len(), 3);
        assert_eq!(
            questions[0].text,
            "[Week1] multiple choice question #1: about Loops/Arrays"
        );
        assert_eq!(questions[0].answer, "A");
        assert_eq!(questions[0].hint, "none");
        assert_eq!(
            questions[0].options,
            vec![
                RawOption::Plain("A. option1".to_string()),
                RawOption::Plain("B. option2".to_string()),
                RawOption::Plain("C. option3".to_string()),
                RawOption::Plain("D. option4".to_string()),
            ]
        );
        assert_eq!(questions[2].kind, QuestionKind::ShortAnswer);
        assert_eq!(
            questions[2].text,
            "[Week1] short answer question #1: please discuss the importance of Loops/Arrays"
        );
    }

    #[test]
    fn test_reconcile_truncates_and_pads() {
        let set = RawQuestionSet {
            multiple_choice: (0..5)
                .map(|i| RawMcq {
                    question: format!("Q{}", i),
                    options: Vec::new(),
                    answer: "C".to_string(),
                    hint: String::new(),
                })
                .collect(),
            short_answer: Vec::new(),
        };
        let week = allocation(3, 2);
        let questions = reconcile(&week, set);

        assert_eq!(questions.len(), 5);
        assert_eq!(questions[2].text, "[Week1] multiple choice question #3: Q2");
        assert_eq!(questions[3].answer, "reference answer about Loops/Arrays");

        let mut week = week;
        week.generated_questions = questions;
        assert!(week.is_complete());
    }

    #[test]
    fn test_content_preview_is_char_safe() {
        assert_eq!(content_preview("héllo wörld", 4), "héll");
        assert_eq!(content_preview("short", 500), "short");
    }

    #[tokio::test]
    async fn test_generate_uses_agent_answer() {
        let answer = json!({
            "multiple_choice": [{"question": "What repeats?", "options": ["A. loop", "B. if"], "answer": "A", "hint": "cycle"}],
            "short_answer": [{"question": "Define an array", "answer": "indexed sequence", "hint": "index"}]
        })
        .to_string();
        let router = router_with(ScriptedProvider::always("ollama", &answer));
        let generator = WeeklyQuestionGenerator::new(router, 5, 500);

        let week = generator.generate(allocation(1, 1), &NoContent).await;

        assert!(week.is_complete());
        assert_eq!(
            week.generated_questions[0].text,
            "[Week1] multiple choice question #1: What repeats?"
        );
        assert_eq!(week.generated_questions[1].answer, "indexed sequence");
    }

    #[tokio::test]
    async fn test_generate_falls_back_on_provider_failure() {
        let router = router_with(ScriptedProvider::failing("ollama"));
        let generator = WeeklyQuestionGenerator::new(router, 5, 500);

        let week = generator.generate(allocation(2, 1), &NoContent).await;

        assert_eq!(week.generated_questions.len(), 3);
        assert!(week.generated_questions.iter().all(|q| q.text.contains("Loops/Arrays")));
    }

    #[tokio::test]
    async fn test_generate_falls_back_on_iteration_ceiling() {
        let router = router_with(ScriptedProvider::always(
            "ollama",
            r#"{"function": "check_questions_quality", "arguments": {"questions_json": "nope"}}"#,
        ));
        let generator = WeeklyQuestionGenerator::new(router, 2, 500);

        let week = generator.generate(allocation(1, 2), &NoContent).await;
        assert!(week.is_complete());
        assert_eq!(week.generated_questions[0].hint, "none");
    }
}
