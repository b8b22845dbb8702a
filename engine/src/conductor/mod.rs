//! Conductor
//!
//! The exam paper pipeline: normalize input, allocate the budget, generate
//! each week, aggregate into one paper. `graph` drives the stages.

pub mod aggregator;
pub mod executor;
pub mod graph;
pub mod normalizer;
pub mod planner;
pub mod prompts;
pub mod summarizer;
pub mod types;

pub use aggregator::ResultAggregator;
pub use executor::WeeklyQuestionGenerator;
pub use graph::{ExamGraph, ExamPipeline, GraphNode, PaperRequest, RunState, StateUpdate};
pub use normalizer::{infer_total_weeks, normalize_input, NormalizeOptions};
pub use planner::BudgetAllocator;
pub use summarizer::LectureSummarizer;
pub use types::{PlanningState, QuestionCounts, WeekAllocation, WeekContentSource};
