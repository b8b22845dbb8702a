//! Command handlers for CLI operations
//!
//! - generate: Build an exam paper from a weekly lecture map
//! - plan: Show the per-week question budget only
//! - summarize: Turn extracted lecture text into a weekly lecture map
//! - doctor: Validate configuration and check providers

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::BudgetArgs;
use crate::conductor::{
    infer_total_weeks, ExamPipeline, LectureSummarizer, PaperRequest, WeekAllocation,
};
use crate::config::Config;
use crate::llm::ollama::OllamaProvider;
use crate::llm::openai::OpenAIProvider;
use crate::llm::router::LLMRouter;
use crate::llm::LLMProvider;
use sdk::errors::{EngineError, EngineErrorExt};
use sdk::types::PaperQuestionKind;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Lecture text extensions picked up by `summarize`
const LECTURE_EXTENSIONS: &[&str] = &["txt", "md"];

/// Build the provider router from configuration.
///
/// Ollama is always registered. OpenAI joins only when its API key variable
/// is set, so a machine without keys still works locally.
pub fn build_router(config: &Config) -> Arc<LLMRouter> {
    let mut providers: Vec<Box<dyn LLMProvider>> =
        vec![Box::new(OllamaProvider::from_config(&config.llm))];

    if OpenAIProvider::has_api_key(&config.llm.openai) {
        providers.push(Box::new(OpenAIProvider::new(config.llm.openai.clone())));
    } else if config.llm.default_provider == "openai" {
        tracing::warn!(
            "Default provider is openai but {} is not set; using Ollama only",
            config.llm.openai.api_key_env
        );
    }

    Arc::new(LLMRouter::new(providers, Arc::new(config.llm.clone())))
}

/// Attach the user-facing hint to an engine error.
fn engine_failure(stage: &str, err: EngineError) -> anyhow::Error {
    let retry = if err.is_recoverable() { " (retrying may help)" } else { "" };
    let message = format!("{} failed: {}{}", stage, err.user_hint(), retry);
    anyhow::Error::new(err).context(message)
}

/// Read a weekly lecture map from disk.
fn read_input(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Input file {} is not valid JSON", path.display()))
}

/// Resolve the paper request: flags first, then the input, then config.
pub fn resolve_request(
    raw: &Value,
    budget: &BudgetArgs,
    title: Option<String>,
    config: &Config,
) -> PaperRequest {
    PaperRequest {
        total_weeks: budget
            .weeks
            .or_else(|| infer_total_weeks(raw))
            .unwrap_or(config.pipeline.total_weeks),
        total_multiple_choice: budget.mcq,
        total_short_answer: budget.short_answer,
        title,
    }
}

/// Write pretty JSON to `output`, or to stdout when no path is given.
fn write_json(value: &impl serde::Serialize, output: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

/// Generate an exam paper
pub async fn handle_generate(
    input: PathBuf,
    budget: BudgetArgs,
    title: Option<String>,
    output: Option<PathBuf>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let raw = read_input(&input)?;
    let request = resolve_request(&raw, &budget, title, config);

    let router = build_router(config);
    let pipeline = ExamPipeline::new(router, config.pipeline.clone());

    let paper = pipeline
        .generate_exam_paper(&raw, request)
        .await
        .map_err(|e| engine_failure("Paper generation", e))?;

    let Some(path) = output.as_deref() else {
        // The paper itself is the output
        return write_json(&paper, None);
    };

    write_json(&paper, Some(path))?;

    let mcq = paper.count_of(PaperQuestionKind::Mcq);
    let short = paper.count_of(PaperQuestionKind::ShortAnswer);
    match format {
        OutputFormat::Text => {
            println!("✓ Paper '{}' written to {}", paper.title, path.display());
            println!("  Paper ID:      {}", paper.id);
            println!("  Questions:     {}", paper.questions.len());
            println!("  Multiple choice: {}", mcq);
            println!("  Short answer:    {}", short);
        }
        OutputFormat::Json => {
            let summary = json!({
                "status": "completed",
                "paperId": paper.id,
                "paperTitle": paper.title,
                "questions": paper.questions.len(),
                "multipleChoice": mcq,
                "shortAnswer": short,
                "output": path.display().to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

fn allocation_json(allocation: &WeekAllocation) -> Value {
    json!({
        "weekNumber": allocation.week_number,
        "topics": allocation.topics,
        "assignedQuestions": allocation.assigned,
    })
}

/// Show the per-week budget without generating questions
pub async fn handle_plan(input: PathBuf, budget: BudgetArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let raw = read_input(&input)?;
    let request = resolve_request(&raw, &budget, None, config);

    let router = build_router(config);
    let pipeline = ExamPipeline::new(router, config.pipeline.clone());

    let (planning, allocations) = pipeline
        .plan_only(&raw, &request)
        .await
        .map_err(|e| engine_failure("Planning", e))?;

    let (mcq, short) = allocations.iter().fold((0u32, 0u32), |(m, s), a| {
        (m.saturating_add(a.assigned.multiple_choice), s.saturating_add(a.assigned.short_answer))
    });

    match format {
        OutputFormat::Text => {
            println!(
                "Budget: {} multiple choice, {} short answer over {} weeks",
                planning.target_counts.multiple_choice,
                planning.target_counts.short_answer,
                planning.total_weeks
            );
            println!();
            for allocation in &allocations {
                println!(
                    "  week{:<3} {:>3} multiple choice {:>3} short answer   {}",
                    allocation.week_number,
                    allocation.assigned.multiple_choice,
                    allocation.assigned.short_answer,
                    allocation.topics.join(", ")
                );
            }
            println!();
            println!("Allocated: {} multiple choice, {} short answer", mcq, short);
            if mcq != planning.target_counts.multiple_choice
                || short != planning.target_counts.short_answer
            {
                println!("⚠ Allocation does not match the requested totals exactly");
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "totalWeeks": planning.total_weeks,
                "targetCounts": planning.target_counts,
                "weeks": allocations.iter().map(allocation_json).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Lecture text files in `dir`, sorted by file name.
pub fn list_lecture_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| LECTURE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Summarize a directory of lecture text into a weekly lecture map
pub async fn handle_summarize(
    dir: PathBuf,
    output: Option<PathBuf>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let files = list_lecture_files(&dir)?;
    if files.is_empty() {
        return Err(anyhow::anyhow!(
            "No .txt or .md lecture files found in {}",
            dir.display()
        ));
    }

    let mut lectures = Vec::with_capacity(files.len());
    for file in &files {
        let text = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        lectures.push(text);
    }

    let summarizer = LectureSummarizer::new(build_router(config));
    let corpus = summarizer.summarize_corpus(lectures).await;

    write_json(&corpus, output.as_deref())?;

    if let Some(path) = output {
        match format {
            OutputFormat::Text => {
                println!("✓ Summarized {} weeks into {}", corpus.len(), path.display());
                for (week, file) in corpus.keys().zip(&files) {
                    println!("  {:<8} {}", week, file.display());
                }
            }
            OutputFormat::Json => {
                let output = json!({
                    "status": "completed",
                    "weeks": corpus.len(),
                    "output": path.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
        }
    }

    Ok(())
}

/// Validate configuration and check provider availability
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(String, String)> = Vec::new();

    // Config is already validated when loaded
    checks.push(("Configuration".to_string(), "Valid".to_string()));
    checks.push((
        "Default provider".to_string(),
        config.llm.default_provider.clone(),
    ));
    checks.push((
        "Ollama model".to_string(),
        config.llm.ollama.model.clone(),
    ));

    if OpenAIProvider::has_api_key(&config.llm.openai) {
        checks.push(("OpenAI API key".to_string(), "Configured".to_string()));
    } else {
        checks.push(("OpenAI API key".to_string(), "Not configured".to_string()));
        if config.llm.default_provider == "openai" {
            issues.push(format!(
                "Default provider is openai but {} is not set.",
                config.llm.openai.api_key_env
            ));
        }
    }

    let router = build_router(config);
    let health = router.check_health().await;
    for (name, healthy) in &health {
        checks.push((
            format!("Provider {}", name),
            if *healthy { "Available" } else { "Not available" }.to_string(),
        ));
        if !healthy && *name == "ollama" {
            issues.push(format!(
                "Ollama is not reachable at {}. Start Ollama to use a local LLM.",
                config.llm.ollama.base_url
            ));
        }
    }
    if !health.iter().any(|(_, healthy)| *healthy) {
        issues.push("No LLM providers available. Configure at least one provider.".to_string());
    }

    let pipeline = &config.pipeline;
    checks.push((
        "Default budget".to_string(),
        format!(
            "{} weeks, {} multiple choice, {} short answer",
            pipeline.total_weeks, pipeline.multiple_choice, pipeline.short_answer
        ),
    ));

    match format {
        OutputFormat::Text => {
            println!("ExamForge System Diagnostics");
            println!("============================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
