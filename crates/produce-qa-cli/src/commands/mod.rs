//! CLI command definitions and handlers.

pub mod grade;
pub mod insights;
pub mod models;
pub mod standards;

use clap::{Parser, Subcommand};

/// Produce QA - Grade produce photos A-D
#[derive(Parser)]
#[command(name = "produce-qa")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Shared grade arguments (paths, thresholds, flags).
    #[command(flatten)]
    pub grade: grade::GradeArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Grade produce photos
    Grade(grade::GradeArgs),
    /// Summarize a batch of reports
    Insights(insights::InsightsArgs),
    /// List product standards
    Standards(standards::StandardsArgs),
    /// Manage ML models
    Models(models::ModelsArgs),
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Everything graded at or above the minimum grade.
    Success,
    /// At least one image graded below `--min-grade`.
    BelowMinGrade,
    /// The command failed.
    Error,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        match code {
            ExitCode::Success => Self::SUCCESS,
            ExitCode::BelowMinGrade => Self::from(1),
            ExitCode::Error => Self::from(2),
        }
    }
}
