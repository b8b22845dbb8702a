//! Budget Allocator
//!
//! Splits the paper's question budget across weeks. The LLM proposes a split;
//! whatever it gets wrong is repaired week by week and type by type, so one
//! bad week never costs the others their suggested counts.

use super::prompts;
use super::types::{week_key, PlanningState, QuestionCounts, WeekAllocation};
use crate::llm::router::LLMRouter;
use crate::llm::{extract_fenced_json, find_json_object};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

const ASSIGNED_KEYS: &[&str] = &["assignedQuestions", "assigned_questions"];
const MCQ_COUNT_KEYS: &[&str] = &["multipleChoice", "multiple_choice", "mcq"];
const SHORT_COUNT_KEYS: &[&str] = &["shortAnswer", "short_answer", "essay"];

pub struct BudgetAllocator {
    router: Arc<LLMRouter>,
}

impl BudgetAllocator {
    pub fn new(router: Arc<LLMRouter>) -> Self {
        Self { router }
    }

    /// Produce one allocation per week, in week order.
    ///
    /// Never fails. When the LLM call errors or its reply cannot be read,
    /// every week gets the even split.
    pub async fn allocate(&self, state: &PlanningState) -> Vec<WeekAllocation> {
        let prompt = prompts::planning_prompt(state);

        let plan = match self.router.complete(&prompt).await {
            Ok(reply) => {
                let parsed = parse_plan(&reply);
                if parsed.is_none() {
                    warn!("Budget plan was not valid JSON, using even split");
                }
                parsed
            }
            Err(e) => {
                warn!("Budget planning call failed: {}, using even split", e);
                None
            }
        };

        let allocations = repair_allocation(plan.as_ref(), state);

        let (mcq, short) = allocations.iter().fold((0u32, 0u32), |(m, s), a| {
            (
                m.saturating_add(a.assigned.multiple_choice),
                s.saturating_add(a.assigned.short_answer),
            )
        });
        info!(
            "Allocated {} multiple choice (target {}) and {} short answer (target {}) across {} weeks",
            mcq,
            state.target_counts.multiple_choice,
            short,
            state.target_counts.short_answer,
            allocations.len()
        );

        allocations
    }
}

/// Read the planner reply as a JSON object.
///
/// Tries the first fenced block, then the whole reply, then the first
/// brace-balanced object inside surrounding prose.
pub fn parse_plan(content: &str) -> Option<Map<String, Value>> {
    let candidates = [
        extract_fenced_json(content),
        Some(content.trim()),
        find_json_object(content),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|candidate| match serde_json::from_str::<Value>(candidate.trim()) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
}

/// Even-split share used whenever a week's suggestion is missing or unusable.
pub fn fallback_share(target: u32, total_weeks: u32) -> u32 {
    if total_weeks == 0 {
        return target.max(1);
    }
    (target / total_weeks).max(1)
}

/// Build the final per-week allocation from a (possibly absent) plan.
pub fn repair_allocation(
    plan: Option<&Map<String, Value>>,
    state: &PlanningState,
) -> Vec<WeekAllocation> {
    let fallback = QuestionCounts::new(
        fallback_share(state.target_counts.multiple_choice, state.total_weeks),
        fallback_share(state.target_counts.short_answer, state.total_weeks),
    );

    (1..=state.total_weeks)
        .map(|week| {
            let suggestion = plan
                .and_then(|p| p.get(&week_key(week)))
                .and_then(|v| v.as_object());

            let topics = suggestion
                .and_then(|s| s.get("topics"))
                .and_then(read_topics)
                .unwrap_or_else(|| state.topics_for(week).to_vec());

            let assigned = suggestion.and_then(|s| {
                ASSIGNED_KEYS
                    .iter()
                    .find_map(|key| s.get(*key))
                    .and_then(|v| v.as_object())
            });

            let multiple_choice = assigned
                .and_then(|a| read_count(a, MCQ_COUNT_KEYS, state.target_counts.multiple_choice))
                .unwrap_or_else(|| {
                    debug!("week{}: repaired multiple choice count", week);
                    fallback.multiple_choice
                });
            let short_answer = assigned
                .and_then(|a| read_count(a, SHORT_COUNT_KEYS, state.target_counts.short_answer))
                .unwrap_or_else(|| {
                    debug!("week{}: repaired short answer count", week);
                    fallback.short_answer
                });

            WeekAllocation::new(week, topics, QuestionCounts::new(multiple_choice, short_answer))
        })
        .collect()
}

fn read_topics(value: &Value) -> Option<Vec<String>> {
    let topics: Vec<String> = value
        .as_array()?
        .iter()
        .filter_map(|t| t.as_str())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    if topics.is_empty() {
        None
    } else {
        Some(topics)
    }
}

/// A positive count under any of `keys`, at most the paper-wide `target`
/// (or 1 when the target is zero).
///
/// Zero, negative, junk and over-target values read as absent.
fn read_count(assigned: &Map<String, Value>, keys: &[&str], target: u32) -> Option<u32> {
    let value = keys.iter().find_map(|key| assigned.get(*key))?;
    let count = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f.floor() as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;

    u32::try_from(count)
        .ok()
        .filter(|c| *c > 0 && *c <= target.max(1))
}
