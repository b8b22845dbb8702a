//! ExamForge SDK
//!
//! Shared error taxonomy and data contracts for the ExamForge engine and
//! anything that consumes the exam papers it produces.

/// Error types and handling
pub mod errors;

/// Lecture input and exam paper types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, EngineErrorExt};
pub use types::{ExamPaper, FinalQuestion, LectureWeekInput, McqOption, PaperQuestionKind};
