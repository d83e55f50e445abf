//! Insights command - summarize a batch of grading reports.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use produce_qa_core::{QualityInsights, QualityReport};
use tracing::{debug, info};

/// Arguments for the insights command
#[derive(Args)]
pub struct InsightsArgs {
    /// Reports as JSON Lines or a JSON array (reads stdin when omitted)
    pub file: Option<PathBuf>,

    /// Pretty-print the summary
    #[arg(long)]
    pub pretty: bool,
}

/// Run the insights command.
pub fn run(args: &InsightsArgs) -> Result<()> {
    let content = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read reports from stdin")?;
            buf
        }
    };

    let reports = parse_reports(&content)?;
    info!("Summarizing {} reports", reports.len());

    let insights =
        QualityInsights::from_reports(&reports).context("No reports to summarize")?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&insights)?
    } else {
        serde_json::to_string(&insights)?
    };
    println!("{json}");
    Ok(())
}

/// Parses a JSON array of reports or one report per line.
fn parse_reports(content: &str) -> Result<Vec<QualityReport>> {
    if content.trim_start().starts_with('[') {
        debug!("Parsing reports as JSON array");
        return serde_json::from_str(content).context("Failed to parse JSON report array");
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid report on line {}", i + 1))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        assert!(parse_reports("").unwrap().is_empty());
        assert!(parse_reports("\n  \n").unwrap().is_empty());
        assert!(parse_reports("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_reports_line_error() {
        let err = parse_reports("\n{not json}\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
