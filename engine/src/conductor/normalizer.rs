//! Input Normalizer
//!
//! Turns the raw weekly lecture map into a `PlanningState`. Input comes from
//! an upstream summarization step and its shape varies, so nothing here
//! fails: absent or malformed weeks simply contribute an empty topic list.

use super::types::{parse_week_key, week_key, PlanningState, QuestionCounts};
use sdk::types::LectureWeekInput;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Weeks covered when nobody says otherwise.
pub const DEFAULT_TOTAL_WEEKS: u32 = 3;

/// Multiple-choice total when neither the request nor the input says.
pub const DEFAULT_MULTIPLE_CHOICE: u32 = 10;

/// Short-answer total when neither the request nor the input says.
pub const DEFAULT_SHORT_ANSWER: u32 = 3;

const MCQ_TOTAL_KEYS: &[&str] = &["totalMultipleChoice", "number_of_MCQ"];
const SHORT_TOTAL_KEYS: &[&str] = &[
    "totalShortAnswer",
    "number_of_short_answer",
    "number_of_Essay",
];

/// Explicit values that override whatever the raw input carries.
///
/// `defaults` applies only when neither the explicit value nor a top-level
/// total in the input is present.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    pub total_weeks: Option<u32>,
    pub total_multiple_choice: Option<u32>,
    pub total_short_answer: Option<u32>,
    pub defaults: QuestionCounts,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            total_weeks: None,
            total_multiple_choice: None,
            total_short_answer: None,
            defaults: QuestionCounts::new(DEFAULT_MULTIPLE_CHOICE, DEFAULT_SHORT_ANSWER),
        }
    }
}

/// Build the planning state for one run.
pub fn normalize_input(raw: &Value, options: &NormalizeOptions) -> PlanningState {
    let empty = Map::new();
    let root = raw.as_object().unwrap_or(&empty);

    let total_weeks = options.total_weeks.unwrap_or(DEFAULT_TOTAL_WEEKS);
    let target_counts = QuestionCounts::new(
        options
            .total_multiple_choice
            .or_else(|| read_total(root, MCQ_TOTAL_KEYS))
            .unwrap_or(options.defaults.multiple_choice),
        options
            .total_short_answer
            .or_else(|| read_total(root, SHORT_TOTAL_KEYS))
            .unwrap_or(options.defaults.short_answer),
    );

    let raw_input: BTreeMap<String, LectureWeekInput> = root
        .iter()
        .filter(|(key, _)| parse_week_key(key).is_some())
        .filter_map(|(key, value)| {
            LectureWeekInput::from_value(value).map(|week| (key.clone(), week))
        })
        .collect();

    let weekly_topics: Vec<Vec<String>> = (1..=total_weeks)
        .map(|week| topics_for_week(raw_input.get(&week_key(week))))
        .collect();

    debug!(
        "Normalized input: {} weeks, {} lecture entries, targets {:?}",
        total_weeks,
        raw_input.len(),
        target_counts
    );

    PlanningState {
        total_weeks,
        target_counts,
        weekly_topics,
        raw_input,
    }
}

/// Count of `week{N}` entries in the raw input, if there are any.
pub fn infer_total_weeks(raw: &Value) -> Option<u32> {
    let count = raw
        .as_object()?
        .keys()
        .filter(|key| parse_week_key(key).is_some())
        .count();
    u32::try_from(count).ok().filter(|n| *n > 0)
}

fn topics_for_week(week: Option<&LectureWeekInput>) -> Vec<String> {
    let Some(week) = week else {
        return Vec::new();
    };

    match (&week.key_points, &week.lecture_title) {
        (Some(points), _) if !points.is_empty() => points.clone(),
        (_, Some(title)) => vec![title.clone()],
        _ => Vec::new(),
    }
}

fn read_total(root: &Map<String, Value>, keys: &[&str]) -> Option<u32> {
    keys.iter()
        .filter_map(|key| root.get(*key))
        .find_map(|value| match value {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
}
