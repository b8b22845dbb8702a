//! Result Aggregator
//!
//! Fan-in step: flattens every week's questions in week order, normalizes
//! option shapes, numbers questions "1".."K" with one counter shared by both
//! kinds, and attaches a search link per question.

use super::types::{GeneratedQuestion, QuestionKind, RawOption, WeekAllocation};
use regex::Regex;
use reqwest::Url;
use sdk::types::{ExamPaper, FinalQuestion, McqOption, PaperQuestionKind};
use std::sync::OnceLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// Option id used when the text carries no `"<letter>."` prefix.
pub const SENTINEL_OPTION_ID: &str = "X";

/// Query parameter the search endpoint reads.
const SEARCH_QUERY_PARAM: &str = "search_query";

fn option_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| {
        Regex::new(r"(?s)^\s*([A-Za-z])\.\s*(.*)$").expect("Invalid option prefix pattern")
    })
}

/// Split `"A. Paris"` into `("A", "Paris")`; unprefixed text gets the sentinel.
fn split_option_text(text: &str) -> (String, String) {
    match option_prefix().captures(text) {
        Some(caps) => (
            caps[1].to_string(),
            caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default().to_string(),
        ),
        None => (SENTINEL_OPTION_ID.to_string(), text.to_string()),
    }
}

/// Canonical form of one generated option.
pub fn normalize_option(option: &RawOption) -> McqOption {
    let (id, text, explanation) = match option {
        RawOption::Plain(text) => {
            let (id, text) = split_option_text(text);
            (id, text, String::new())
        }
        RawOption::Annotated { text, explanation } => {
            let (id, text) = split_option_text(text);
            (id, text, explanation.clone())
        }
        RawOption::Opaque(value) => (SENTINEL_OPTION_ID.to_string(), value.to_string(), String::new()),
    };

    McqOption {
        id,
        title: text.clone(),
        value: text,
        explanation,
    }
}

pub struct ResultAggregator {
    resource_search_url: String,
}

impl ResultAggregator {
    pub fn new(resource_search_url: impl Into<String>) -> Self {
        Self {
            resource_search_url: resource_search_url.into(),
        }
    }

    /// Search URL for a question's text, query URL-encoded.
    pub fn resource_link(&self, question_text: &str) -> String {
        match Url::parse_with_params(&self.resource_search_url, &[(SEARCH_QUERY_PARAM, question_text)]) {
            Ok(mut url) => {
                // Spaces as %20, not the form-style '+'; a literal '+' is already %2B
                let query = url.query().map(|q| q.replace('+', "%20"));
                url.set_query(query.as_deref());
                url.to_string()
            }
            Err(e) => {
                warn!("Invalid resource search URL {}: {}", self.resource_search_url, e);
                String::new()
            }
        }
    }

    /// Build the paper. Allocations are sorted by week number first, so the
    /// caller's ordering does not matter.
    pub fn aggregate(&self, mut allocations: Vec<WeekAllocation>, title: &str) -> ExamPaper {
        allocations.sort_by_key(|a| a.week_number);

        let (questions, count) = allocations
            .into_iter()
            .flat_map(|a| a.generated_questions)
            .fold((Vec::new(), 0usize), |(mut questions, count), question| {
                let id = (count + 1).to_string();
                questions.push(self.finalize(id, question));
                (questions, count + 1)
            });

        debug!("Aggregated {} questions into '{}'", count, title);

        ExamPaper {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            questions,
        }
    }

    fn finalize(&self, id: String, question: GeneratedQuestion) -> FinalQuestion {
        let resource_link = self.resource_link(&question.text);

        match question.kind {
            QuestionKind::MultipleChoice => FinalQuestion {
                id,
                title: question.text,
                kind: PaperQuestionKind::Mcq,
                answer: Some(question.answer),
                user_answer: String::new(),
                hint: question.hint,
                options: Some(question.options.iter().map(normalize_option).collect()),
                resource_link,
            },
            // The reference answer travels in `hint`; the schema has no other slot for it.
            QuestionKind::ShortAnswer => FinalQuestion {
                id,
                title: question.text,
                kind: PaperQuestionKind::ShortAnswer,
                answer: None,
                user_answer: String::new(),
                hint: question.answer,
                options: None,
                resource_link,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conductor::types::QuestionCounts;
    use serde_json::json;

    fn aggregator() -> ResultAggregator {
        ResultAggregator::new("https://www.youtube.com/results")
    }

    fn question(kind: QuestionKind, text: &str, answer: &str) -> GeneratedQuestion {
        GeneratedQuestion {
            text: text.to_string(),
            kind,
            answer: answer.to_string(),
            hint: "h".to_string(),
            options: Vec::new(),
            resource_link: String::new(),
        }
    }

    fn week(n: u32, questions: Vec<GeneratedQuestion>) -> WeekAllocation {
        let mut allocation = WeekAllocation::new(n, Vec::new(), QuestionCounts::new(1, 1));
        allocation.generated_questions = questions;
        allocation
    }

    #[test]
    fn test_normalize_option_shapes() {
        let plain = normalize_option(&RawOption::Plain("B. Tokyo".to_string()));
        assert_eq!(plain.id, "B");
        assert_eq!(plain.title, "Tokyo");
        assert_eq!(plain.value, "Tokyo");
        assert_eq!(plain.explanation, "");

        let annotated = normalize_option(&RawOption::from_value(
            json!({"option": "C. Rome", "explanation": "historical capital"}),
        ));
        assert_eq!(annotated.id, "C");
        assert_eq!(annotated.title, "Rome");
        assert_eq!(annotated.explanation, "historical capital");

        let opaque = normalize_option(&RawOption::from_value(json!(42)));
        assert_eq!(opaque.id, SENTINEL_OPTION_ID);
        assert_eq!(opaque.title, "42");
        assert_eq!(opaque.value, "42");
    }

    #[test]
    fn test_unprefixed_option_keeps_full_text() {
        let option = normalize_option(&RawOption::Plain("Paris".to_string()));
        assert_eq!(option.id, "X");
        assert_eq!(option.title, "Paris");

        let option = normalize_option(&RawOption::Plain("  d.   Berlin ".to_string()));
        assert_eq!(option.id, "d");
        assert_eq!(option.title, "Berlin");
    }

    #[test]
    fn test_ids_follow_week_order() {
        let weeks = vec![
            week(2, vec![question(QuestionKind::MultipleChoice, "w2 q1", "A")]),
            week(
                1,
                vec![
                    question(QuestionKind::MultipleChoice, "w1 q1", "B"),
                    question(QuestionKind::ShortAnswer, "w1 q2", "because"),
                ],
            ),
        ];
        let paper = aggregator().aggregate(weeks, "Midterm");

        let ids: Vec<&str> = paper.questions.iter().map(|q| q.id.as_str()).collect();
        let titles: Vec<&str> = paper.questions.iter().map(|q| q.title.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(titles, vec!["w1 q1", "w1 q2", "w2 q1"]);
        assert_eq!(paper.title, "Midterm");
        assert!(Uuid::parse_str(&paper.id).is_ok());
    }

    #[test]
    fn test_short_answer_reference_goes_to_hint() {
        let paper = aggregator().aggregate(
            vec![week(1, vec![question(QuestionKind::ShortAnswer, "Why?", "use a hash map")])],
            "T",
        );
        let q = &paper.questions[0];

        assert_eq!(q.hint, "use a hash map");
        assert!(q.answer.is_none());
        assert!(q.options.is_none());
        assert_eq!(q.kind, PaperQuestionKind::ShortAnswer);
        assert_eq!(q.user_answer, "");
    }

    #[test]
    fn test_resource_link_is_encoded() {
        let link = aggregator().resource_link("[Week1] what is a B-tree?");
        assert!(link.starts_with("https://www.youtube.com/results?search_query="));
        assert!(!link.contains(' '));
        assert!(link.contains("B-tree"));
        assert_eq!(link.matches('?').count(), 1);
    }

    #[test]
    fn test_resource_link_spaces_are_percent_encoded() {
        let link = aggregator().resource_link("what is C++ used for");
        assert_eq!(
            link,
            "https://www.youtube.com/results?search_query=what%20is%20C%2B%2B%20used%20for"
        );
        assert!(!link.contains('+'));
    }

    #[test]
    fn test_empty_input_gives_empty_paper() {
        let paper = aggregator().aggregate(Vec::new(), "Empty");
        assert!(paper.questions.is_empty());
    }
}
