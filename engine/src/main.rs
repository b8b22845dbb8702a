// ExamForge Engine
// Main entry point for the examforge binary

use clap::Parser;
use examforge_engine::cli::{Cli, Command};
use examforge_engine::config::Config;
use examforge_engine::handlers::{
    handle_doctor, handle_generate, handle_plan, handle_summarize, OutputFormat,
};
use examforge_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the config file; RUST_LOG wins over both
    let level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("ExamForge Engine v{} ({} - {})", version, commit, timestamp);

    // Handle commands
    match cli.command {
        Command::Generate {
            input,
            budget,
            title,
            output,
        } => {
            tracing::info!("Generating exam paper from {}", input.display());
            handle_generate(input, budget, title, output, &config, format).await
        }

        Command::Plan { input, budget } => {
            tracing::info!("Planning question budget for {}", input.display());
            handle_plan(input, budget, &config, format).await
        }

        Command::Summarize { dir, output } => {
            tracing::info!("Summarizing lectures in {}", dir.display());
            handle_summarize(dir, output, &config, format).await
        }

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }
    }
}
