//! Integration tests for configuration management
//!
//! These tests load real TOML files from a temporary directory.

use std::fs;
use tempfile::TempDir;

use examforge_engine::config::Config;
use sdk::errors::EngineError;

#[test]
fn test_config_toml_parsing() {
    let toml_content = r#"
[core]
log_level = "debug"

[llm]
default_provider = "ollama"
local_timeout_secs = 120
cloud_timeout_secs = 30

[llm.ollama]
base_url = "http://gpu-box:11434"
model = "qwen2.5:14b"

[llm.openai]
model = "gpt-4o-mini"
api_key_env = "EXAMFORGE_OPENAI_KEY"
temperature = 0.2

[pipeline]
total_weeks = 12
multiple_choice = 24
short_answer = 6
paper_title = "Final Exam"
max_agent_iterations = 6
content_preview_chars = 800
max_parallel_weeks = 2
resource_search_url = "https://search.example.edu/find"
"#;

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, toml_content).unwrap();

    let config = Config::load_from_path(&config_path).unwrap();

    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.llm.local_timeout_secs, 120);
    assert_eq!(config.llm.ollama.base_url, "http://gpu-box:11434");
    assert_eq!(config.llm.ollama.model, "qwen2.5:14b");
    assert_eq!(config.llm.openai.api_key_env, "EXAMFORGE_OPENAI_KEY");
    assert_eq!(config.pipeline.total_weeks, 12);
    assert_eq!(config.pipeline.multiple_choice, 24);
    assert_eq!(config.pipeline.short_answer, 6);
    assert_eq!(config.pipeline.paper_title, "Final Exam");
    assert_eq!(config.pipeline.max_parallel_weeks, 2);
    assert_eq!(
        config.pipeline.resource_search_url,
        "https://search.example.edu/find"
    );
}

#[test]
fn test_partial_config_fills_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[pipeline]\nmultiple_choice = 4\n").unwrap();

    let config = Config::load_from_path(&config_path).unwrap();

    assert_eq!(config.pipeline.multiple_choice, 4);
    assert_eq!(config.pipeline.short_answer, 3);
    assert_eq!(config.pipeline.total_weeks, 3);
    assert_eq!(config.llm.default_provider, "ollama");
    assert_eq!(config.core.log_level, "info");
}

#[test]
fn test_missing_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = Config::load_from_path(&temp_dir.path().join("absent.toml"));

    assert!(matches!(result, Err(EngineError::Config(_))));
}

#[test]
fn test_invalid_values_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let cases = [
        ("[core]\nlog_level = \"loud\"\n", "log level"),
        ("[pipeline]\nmax_parallel_weeks = 0\n", "max_parallel_weeks"),
        ("[pipeline]\nmax_agent_iterations = 0\n", "max_agent_iterations"),
        ("[pipeline]\nresource_search_url = \"not a url\"\n", "resource_search_url"),
        ("[llm]\nlocal_timeout_secs = 0\n", "timeouts"),
        ("[pipeline\n", "parse"),
    ];

    for (i, (contents, expected)) in cases.iter().enumerate() {
        let path = temp_dir.path().join(format!("bad{}.toml", i));
        fs::write(&path, contents).unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(
            err.to_string().contains(expected),
            "expected '{}' in error for {:?}, got: {}",
            expected,
            contents,
            err
        );
    }
}
