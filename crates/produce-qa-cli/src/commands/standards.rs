//! Standards command - list product quality standards.

use anyhow::Result;
use clap::Args;

use crate::config::AppConfig;

/// Arguments for the standards command
#[derive(Args)]
pub struct StandardsArgs {
    /// Print the standards as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the standards command with the merged configuration.
pub fn run(args: &StandardsArgs, config: &AppConfig) -> Result<()> {
    let catalog = config.catalog();

    if args.json {
        let standards: Vec<_> = catalog.iter().collect();
        println!("{}", serde_json::to_string_pretty(&standards)?);
        return Ok(());
    }

    println!(
        "{:<10} {:>11} {:>9} {:>9} {:>17} {:>6} {:>6}",
        "type", "hue", "sat", "val", "size (px)", "circ", "tol"
    );
    for s in catalog.iter() {
        let source = if config.standards.keys().any(|k| k.trim().eq_ignore_ascii_case(&s.name)) {
            " (config)"
        } else {
            ""
        };
        println!(
            "{:<10} {:>5}-{:<5} {:>4}-{:<4} {:>4}-{:<4} {:>8}-{:<8} {:>6.2} {:>6.2}{source}",
            s.name,
            s.hue.min,
            s.hue.max,
            s.saturation.0,
            s.saturation.1,
            s.value.0,
            s.value.1,
            s.size_range.0,
            s.size_range.1,
            s.circularity,
            s.defect_tolerance,
        );
    }
    println!();
    println!("{} standards", catalog.len());

    Ok(())
}
