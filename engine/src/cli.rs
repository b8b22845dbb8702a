//! CLI interface for ExamForge
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ExamForge exam paper generator
///
/// Builds practice exam papers from weekly lecture material using a local or
/// hosted LLM.
#[derive(Parser, Debug)]
#[command(name = "examforge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Question budget flags shared by `generate` and `plan`
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BudgetArgs {
    /// Weeks to cover (default: number of weekN entries in the input)
    #[arg(long, value_name = "N")]
    pub weeks: Option<u32>,

    /// Total multiple choice questions
    #[arg(long, value_name = "N")]
    pub mcq: Option<u32>,

    /// Total short answer questions
    #[arg(long = "short-answer", value_name = "N")]
    pub short_answer: Option<u32>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate an exam paper from a weekly lecture JSON file
    Generate {
        /// Weekly lecture map (week1, week2, ...)
        input: PathBuf,

        #[command(flatten)]
        budget: BudgetArgs,

        /// Paper title
        #[arg(long)]
        title: Option<String>,

        /// Write the paper here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show how the question budget would be split across weeks
    Plan {
        /// Weekly lecture map (week1, week2, ...)
        input: PathBuf,

        #[command(flatten)]
        budget: BudgetArgs,
    },

    /// Summarize extracted lecture text files into a weekly lecture map
    Summarize {
        /// Directory of .txt/.md files, one per week, in name order
        dir: PathBuf,

        /// Write the map here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Run system diagnostics
    Doctor,
}
