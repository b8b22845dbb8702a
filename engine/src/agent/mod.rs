//! Agent Loop
//!
//! Tool-using conversation loop driven by the LLM router. The weekly
//! question generator runs one of these per week.

pub mod core;
pub mod working_memory;

pub use core::{AgentOutcome, ToolAgent};
pub use working_memory::WorkingMemory;
