//! Configuration management
//!
//! This module handles loading, validation, and management of the ExamForge
//! configuration. Configuration is stored in TOML format at
//! ~/.examforge/config.toml and created with defaults on first use.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **llm**: Provider selection, per-call timeouts, provider endpoints
//! - **pipeline**: Default question budget and generation limits
//!
//! # Examples
//!
//! ```no_run
//! use examforge_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Default provider: {}", config.llm.default_provider);
//! println!("Weeks: {}", config.pipeline.total_weeks);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Providers the engine knows how to construct
pub const SUPPORTED_PROVIDERS: &[&str] = &["ollama", "openai"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Paper generation settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Default LLM provider (ollama, openai)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Per-call budget for local providers, in seconds
    #[serde(default = "default_local_timeout")]
    pub local_timeout_secs: u64,

    /// Per-call budget for cloud providers, in seconds
    #[serde(default = "default_cloud_timeout")]
    pub cloud_timeout_secs: u64,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// OpenAI provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for OpenAI-compatible API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Environment variable holding the API key (the key itself never lives in config)
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f64,
}

/// Paper generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Weeks covered when the request does not say
    #[serde(default = "default_total_weeks")]
    pub total_weeks: u32,

    /// Multiple-choice total when neither the request nor the input says
    #[serde(default = "default_multiple_choice")]
    pub multiple_choice: u32,

    /// Short-answer total when neither the request nor the input says
    #[serde(default = "default_short_answer")]
    pub short_answer: u32,

    /// Title given to generated papers
    #[serde(default = "default_paper_title")]
    pub paper_title: String,

    /// Tool-use rounds a weekly agent gets before falling back to placeholders
    #[serde(default = "default_max_agent_iterations")]
    pub max_agent_iterations: usize,

    /// Characters of lecture text included in a week's instruction
    #[serde(default = "default_content_preview_chars")]
    pub content_preview_chars: usize,

    /// Week nodes allowed to run at the same time
    #[serde(default = "default_max_parallel_weeks")]
    pub max_parallel_weeks: usize,

    /// Search endpoint used for each question's learning resource
    #[serde(default = "default_resource_search_url")]
    pub resource_search_url: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_local_timeout() -> u64 {
    300
}

fn default_cloud_timeout() -> u64 {
    120
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_total_weeks() -> u32 {
    3
}

fn default_multiple_choice() -> u32 {
    10
}

fn default_short_answer() -> u32 {
    3
}

fn default_paper_title() -> String {
    "Test Paper".to_string()
}

fn default_max_agent_iterations() -> usize {
    10
}

fn default_content_preview_chars() -> usize {
    500
}

fn default_max_parallel_weeks() -> usize {
    4
}

fn default_resource_search_url() -> String {
    "https://www.youtube.com/results".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            local_timeout_secs: default_local_timeout(),
            cloud_timeout_secs: default_cloud_timeout(),
            ollama: OllamaConfig::default(),
            openai: OpenAIConfig::default(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            api_key_env: default_openai_api_key_env(),
            temperature: 0.0,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            total_weeks: default_total_weeks(),
            multiple_choice: default_multiple_choice(),
            short_answer: default_short_answer(),
            paper_title: default_paper_title(),
            max_agent_iterations: default_max_agent_iterations(),
            content_preview_chars: default_content_preview_chars(),
            max_parallel_weeks: default_max_parallel_weeks(),
            resource_search_url: default_resource_search_url(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.examforge/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default_config();
        config.validate_and_process()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Created default configuration at {:?}", path);
        Ok(config)
    }

    /// Get the default configuration file path (~/.examforge/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".examforge").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LLMConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if:
    /// - The log level or default provider is unknown
    /// - A pipeline limit is zero
    /// - The resource search URL does not parse
    pub fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if !SUPPORTED_PROVIDERS.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.llm.default_provider,
                SUPPORTED_PROVIDERS.join(", ")
            )));
        }

        if self.llm.local_timeout_secs == 0 || self.llm.cloud_timeout_secs == 0 {
            return Err(EngineError::Config(
                "LLM timeouts must be at least 1 second".to_string(),
            ));
        }

        let pipeline = &self.pipeline;
        if pipeline.total_weeks < 1 {
            return Err(EngineError::Config(
                "pipeline.total_weeks must be at least 1".to_string(),
            ));
        }
        if pipeline.max_agent_iterations < 1 {
            return Err(EngineError::Config(
                "pipeline.max_agent_iterations must be at least 1".to_string(),
            ));
        }
        if pipeline.max_parallel_weeks < 1 {
            return Err(EngineError::Config(
                "pipeline.max_parallel_weeks must be at least 1".to_string(),
            ));
        }
        if let Err(e) = reqwest::Url::parse(&pipeline.resource_search_url) {
            return Err(EngineError::Config(format!(
                "Invalid resource_search_url '{}': {}",
                pipeline.resource_search_url, e
            )));
        }

        self.pipeline.paper_title = self.pipeline.paper_title.trim().to_string();
        if self.pipeline.paper_title.is_empty() {
            self.pipeline.paper_title = default_paper_title();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.default_provider, "ollama");
        assert_eq!(config.pipeline.total_weeks, 3);
        assert_eq!(config.pipeline.multiple_choice, 10);
        assert_eq!(config.pipeline.short_answer, 3);
        assert_eq!(config.pipeline.content_preview_chars, 500);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(
            config.llm.default_provider,
            deserialized.llm.default_provider
        );
        assert_eq!(
            config.pipeline.resource_search_url,
            deserialized.pipeline.resource_search_url
        );
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.pipeline.paper_title, "Test Paper");
        assert_eq!(config.llm.openai.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_rejects_zero_weeks() {
        let err = Config::from_toml_str("[pipeline]\ntotal_weeks = 0\n").unwrap_err();
        assert!(err.to_string().contains("total_weeks"));
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let err = Config::from_toml_str("[llm]\ndefault_provider = \"gemini\"\n").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_blank_title_falls_back() {
        let config = Config::from_toml_str("[pipeline]\npaper_title = \"   \"\n").unwrap();
        assert_eq!(config.pipeline.paper_title, "Test Paper");
    }
}
