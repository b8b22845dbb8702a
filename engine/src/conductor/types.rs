//! Conductor Types
//!
//! Run-scoped data that flows between the pipeline stages: the normalized
//! planning state, per-week allocations, and questions before normalization.

use sdk::types::LectureWeekInput;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Key under which a week's lecture material is stored, e.g. `week3`.
pub fn week_key(week_number: u32) -> String {
    format!("week{}", week_number)
}

/// Parse a `week{N}` key back into its week number.
pub fn parse_week_key(key: &str) -> Option<u32> {
    key.strip_prefix("week")?.parse().ok()
}

/// A pair of per-kind question counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionCounts {
    pub multiple_choice: u32,
    pub short_answer: u32,
}

impl QuestionCounts {
    pub fn new(multiple_choice: u32, short_answer: u32) -> Self {
        Self {
            multiple_choice,
            short_answer,
        }
    }

    pub fn total(&self) -> u32 {
        self.multiple_choice.saturating_add(self.short_answer)
    }
}

/// Normalized view of one run's input, built once by the normalizer.
///
/// `weekly_topics[i]` belongs to week `i + 1` and the vector always has
/// exactly `total_weeks` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningState {
    pub total_weeks: u32,
    pub target_counts: QuestionCounts,
    pub weekly_topics: Vec<Vec<String>>,
    pub raw_input: BTreeMap<String, LectureWeekInput>,
}

impl PlanningState {
    /// Topics for a 1-indexed week; empty for weeks out of range.
    pub fn topics_for(&self, week_number: u32) -> &[String] {
        week_number
            .checked_sub(1)
            .and_then(|i| self.weekly_topics.get(i as usize))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Lookup of a week's original lecture text.
pub trait WeekContentSource: Send + Sync {
    fn week_content(&self, week_number: u32) -> Option<&str>;
}

impl WeekContentSource for PlanningState {
    fn week_content(&self, week_number: u32) -> Option<&str> {
        self.raw_input
            .get(&week_key(week_number))
            .and_then(|week| week.content.as_deref())
    }
}

/// Question kind before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    ShortAnswer,
}

/// A multiple-choice option exactly as the generator produced it.
///
/// Generated JSON is converted into this closed set as soon as it is parsed,
/// so later stages never inspect raw JSON types.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOption {
    /// `"A. Paris"`
    Plain(String),
    /// `{"option": "A. Paris", "explanation": "..."}`
    Annotated { text: String, explanation: String },
    /// Anything else, kept verbatim.
    Opaque(Value),
}

impl RawOption {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => RawOption::Plain(text),
            Value::Object(obj) => {
                let text = obj.get("option").and_then(|v| v.as_str()).map(String::from);
                match text {
                    Some(text) => RawOption::Annotated {
                        text,
                        explanation: obj
                            .get("explanation")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                    },
                    None => RawOption::Opaque(Value::Object(obj)),
                }
            }
            other => RawOption::Opaque(other),
        }
    }
}

/// A question as produced for one week, before aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedQuestion {
    pub text: String,
    pub kind: QuestionKind,
    pub answer: String,
    pub hint: String,
    pub options: Vec<RawOption>,
    pub resource_link: String,
}

/// One week's slice of the budget and, once generated, its questions.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekAllocation {
    pub week_number: u32,
    pub topics: Vec<String>,
    pub assigned: QuestionCounts,
    pub generated_questions: Vec<GeneratedQuestion>,
}

impl WeekAllocation {
    pub fn new(week_number: u32, topics: Vec<String>, assigned: QuestionCounts) -> Self {
        Self {
            week_number,
            topics,
            assigned,
            generated_questions: Vec::new(),
        }
    }

    /// Whether the attached questions match the assigned budget.
    pub fn is_complete(&self) -> bool {
        let mcq = self
            .generated_questions
            .iter()
            .filter(|q| q.kind == QuestionKind::MultipleChoice)
            .count();
        let short = self.generated_questions.len() - mcq;
        mcq == self.assigned.multiple_choice as usize && short == self.assigned.short_answer as usize
    }
}
