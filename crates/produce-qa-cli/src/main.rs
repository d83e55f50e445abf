//! Produce QA CLI - Automated produce photo grading tool.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{grade::GradeArgs, Cli, Commands, ExitCode};
use config::AppConfig;

fn report_error(e: &anyhow::Error) -> ExitCode {
    eprintln!("error: {e:#}");
    ExitCode::Error
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load();

    let exit_code = match cli.command {
        Some(Commands::Grade(args)) => {
            let args = GradeArgs::with_config(args, &config);
            commands::grade::run(&args).map_or_else(|e| report_error(&e), |r| r.exit_code)
        }
        Some(Commands::Insights(ref args)) => commands::insights::run(args)
            .map_or_else(|e| report_error(&e), |()| ExitCode::Success),
        Some(Commands::Standards(ref args)) => commands::standards::run(args, &config)
            .map_or_else(|e| report_error(&e), |()| ExitCode::Success),
        Some(Commands::Models(ref args)) => commands::models::run(args, &config)
            .map_or_else(|e| report_error(&e), |()| ExitCode::Success),
        None => {
            // Default behavior: run grade with flattened args
            if cli.grade.paths.is_empty() {
                eprintln!("error: No paths specified. Use --help for usage information.");
                return ExitCode::Error.into();
            }
            let args = GradeArgs::with_config(cli.grade, &config);
            commands::grade::run(&args).map_or_else(|e| report_error(&e), |r| r.exit_code)
        }
    };

    exit_code.into()
}
