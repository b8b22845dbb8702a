//! Lecture Summarizer
//!
//! Produces the weekly lecture map the normalizer reads, from text that has
//! already been extracted from the slides. A failed summary keeps the text
//! as `content` only, so the week still reaches the generator.

use super::prompts;
use super::types::week_key;
use crate::llm::router::LLMRouter;
use crate::llm::{find_json_object, strip_code_fence};
use sdk::types::LectureWeekInput;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

pub struct LectureSummarizer {
    router: Arc<LLMRouter>,
}

impl LectureSummarizer {
    pub fn new(router: Arc<LLMRouter>) -> Self {
        Self { router }
    }

    /// Summarize one week's lecture text. Never fails.
    pub async fn summarize(&self, lecture_text: &str) -> LectureWeekInput {
        let reply = match self
            .router
            .complete(&prompts::summarize_lecture_prompt(lecture_text))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Lecture summary call failed: {}, keeping text only", e);
                return LectureWeekInput::from_content(lecture_text);
            }
        };

        match parse_summary(&reply) {
            Some(mut week) => {
                week.content = Some(lecture_text.to_string());
                week
            }
            None => {
                warn!("Lecture summary was not valid JSON, keeping text only");
                LectureWeekInput::from_content(lecture_text)
            }
        }
    }

    /// Summarize weeks in order into a `week1..weekN` map.
    pub async fn summarize_corpus(&self, lectures: Vec<String>) -> Map<String, Value> {
        let mut corpus = Map::new();
        for (i, text) in lectures.iter().enumerate() {
            let week_number = i as u32 + 1;
            let week = self.summarize(text).await;
            info!(
                "week{}: summarized ({} key points)",
                week_number,
                week.key_points.as_ref().map(Vec::len).unwrap_or(0)
            );
            match serde_json::to_value(&week) {
                Ok(value) => {
                    corpus.insert(week_key(week_number), value);
                }
                Err(e) => warn!("week{}: could not serialize summary: {}", week_number, e),
            }
        }
        corpus
    }
}

fn parse_summary(reply: &str) -> Option<LectureWeekInput> {
    let stripped = strip_code_fence(reply);
    let value = serde_json::from_str::<Value>(stripped)
        .ok()
        .or_else(|| find_json_object(stripped).and_then(|s| serde_json::from_str(s).ok()))?;
    LectureWeekInput::from_value(&value)
}
