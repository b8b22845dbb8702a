//! Shared data contracts
//!
//! `LectureWeekInput` is what the lecture-processing side hands to the
//! pipeline. `ExamPaper` and friends are the serialized paper shape that
//! downstream consumers read, so their field names must not drift.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One week's raw lecture material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LectureWeekInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_points: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lecture_title: Option<String>,

    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl LectureWeekInput {
    /// Read a week entry without failing on odd field types.
    ///
    /// Returns `None` when the value is not a JSON object at all. Fields of the
    /// wrong type are treated as absent, and non-string key points are skipped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let key_points = obj
            .get("keyPoints")
            .or_else(|| obj.get("key_points"))
            .and_then(|v| v.as_array())
            .map(|points| {
                points
                    .iter()
                    .filter_map(|p| p.as_str())
                    .map(String::from)
                    .collect::<Vec<_>>()
            });

        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| obj.get(*k).and_then(|v| v.as_str()))
                .map(String::from)
        };

        Some(Self {
            key_points,
            lecture_title: text(&["lectureTitle", "lecture_title", "title"]),
            summary: text(&["abstract"]),
            content: text(&["content"]),
        })
    }

    /// Create an input that only carries lecture text.
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

/// Canonical question type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperQuestionKind {
    Mcq,
    ShortAnswer,
}

/// One normalized multiple-choice option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McqOption {
    #[serde(rename = "optionId")]
    pub id: String,

    #[serde(rename = "optionTitle")]
    pub title: String,

    #[serde(rename = "optionValue")]
    pub value: String,

    pub explanation: String,
}

/// A question in its final, canonical shape.
///
/// `answer` and `options` are only present for multiple-choice questions.
/// For short-answer questions the reference answer travels in `hint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalQuestion {
    #[serde(rename = "questionId")]
    pub id: String,

    #[serde(rename = "questionTitle")]
    pub title: String,

    #[serde(rename = "questionType")]
    pub kind: PaperQuestionKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,

    #[serde(rename = "userAnswer", default)]
    pub user_answer: String,

    #[serde(default)]
    pub hint: String,

    #[serde(
        rename = "mcqOptions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub options: Option<Vec<McqOption>>,

    #[serde(rename = "learningResource", default)]
    pub resource_link: String,
}

/// Root artifact of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamPaper {
    #[serde(rename = "paperId")]
    pub id: String,

    #[serde(rename = "paperTitle")]
    pub title: String,

    #[serde(rename = "question")]
    pub questions: Vec<FinalQuestion>,
}

impl ExamPaper {
    /// Number of questions of the given kind.
    pub fn count_of(&self, kind: PaperQuestionKind) -> usize {
        self.questions.iter().filter(|q| q.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mcq() -> FinalQuestion {
        FinalQuestion {
            id: "1".to_string(),
            title: "[Week1] multiple choice question #1: Capital of Japan?".to_string(),
            kind: PaperQuestionKind::Mcq,
            answer: Some("B".to_string()),
            user_answer: String::new(),
            hint: "Think about Asia".to_string(),
            options: Some(vec![McqOption {
                id: "B".to_string(),
                title: "Tokyo".to_string(),
                value: "Tokyo".to_string(),
                explanation: String::new(),
            }]),
            resource_link: "https://www.youtube.com/results?search_query=x".to_string(),
        }
    }

    #[test]
    fn test_mcq_wire_shape() {
        let value = serde_json::to_value(mcq()).unwrap();
        assert_eq!(value["questionId"], "1");
        assert_eq!(value["questionType"], "mcq");
        assert_eq!(value["answer"], "B");
        assert_eq!(value["userAnswer"], "");
        assert_eq!(value["mcqOptions"][0]["optionId"], "B");
        assert_eq!(value["mcqOptions"][0]["optionTitle"], "Tokyo");
        assert_eq!(value["mcqOptions"][0]["optionValue"], "Tokyo");
        assert_eq!(value["mcqOptions"][0]["explanation"], "");
        assert!(value["learningResource"].as_str().unwrap().starts_with("https://"));
    }

    #[test]
    fn test_short_answer_omits_answer_and_options() {
        let question = FinalQuestion {
            kind: PaperQuestionKind::ShortAnswer,
            answer: None,
            options: None,
            hint: "use a hash map".to_string(),
            ..mcq()
        };
        let value = serde_json::to_value(question).unwrap();
        let obj = value.as_object().unwrap();

        assert_eq!(obj["questionType"], "short_answer");
        assert_eq!(obj["hint"], "use a hash map");
        assert!(!obj.contains_key("answer"));
        assert!(!obj.contains_key("mcqOptions"));
    }

    #[test]
    fn test_paper_top_level_keys() {
        let paper = ExamPaper {
            id: "abc".to_string(),
            title: "Test Paper".to_string(),
            questions: vec![mcq()],
        };
        let value = serde_json::to_value(&paper).unwrap();
        assert_eq!(value["paperId"], "abc");
        assert_eq!(value["paperTitle"], "Test Paper");
        assert_eq!(value["question"].as_array().unwrap().len(), 1);
        assert_eq!(paper.count_of(PaperQuestionKind::Mcq), 1);
    }

    #[test]
    fn test_lecture_input_tolerates_bad_fields() {
        let input = LectureWeekInput::from_value(&json!({
            "keyPoints": ["Loops", 3, "Arrays"],
            "lectureTitle": 42,
            "content": "for loops iterate"
        }))
        .unwrap();

        assert_eq!(
            input.key_points,
            Some(vec!["Loops".to_string(), "Arrays".to_string()])
        );
        assert_eq!(input.lecture_title, None);
        assert_eq!(input.content.as_deref(), Some("for loops iterate"));
    }

    #[test]
    fn test_lecture_input_rejects_non_objects() {
        assert!(LectureWeekInput::from_value(&json!("week one")).is_none());
        assert!(LectureWeekInput::from_value(&json!(null)).is_none());
    }

    #[test]
    fn test_lecture_input_serializes_abstract_key() {
        let input = LectureWeekInput {
            summary: Some("Intro".to_string()),
            ..LectureWeekInput::default()
        };
        let value = serde_json::to_value(input).unwrap();
        assert_eq!(value, json!({"abstract": "Intro"}));
    }
}
