//! ExamForge Engine Library
//!
//! Turns weekly lecture material into a structured practice exam paper. It
//! is used by both the `examforge` binary and the integration tests.

/// Configuration management module
pub mod config;

/// LLM provider abstraction layer
pub mod llm;

/// Bounded tool-use agent loop
pub mod agent;

/// Question sub-tools offered to the agent
pub mod tools;

/// Exam paper pipeline
pub mod conductor;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
