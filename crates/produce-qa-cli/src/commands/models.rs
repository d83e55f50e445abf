//! Models command - manage ML models.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use clap::{Args, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use produce_qa_adapters::ModelStore;

use crate::config::AppConfig;

/// Arguments for the models command
#[derive(Args)]
pub struct ModelsArgs {
    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR", global = true)]
    pub models_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Models subcommands
#[derive(Subcommand)]
pub enum ModelsCommand {
    /// Download required models
    Fetch,
    /// List installed models
    List,
    /// Print model directory path
    Path,
}

/// Run the models command.
pub fn run(args: &ModelsArgs, config: &AppConfig) -> Result<()> {
    let dir = args.models_dir.clone().or_else(|| config.models.dir.clone());
    let mut store = dir.map_or_else(ModelStore::default, ModelStore::new);
    if let Some(url) = &config.models.base_url {
        store = store.with_base_url(url.clone());
    }

    match args.command {
        ModelsCommand::Fetch => fetch_models(&store),
        ModelsCommand::List => {
            list_models(&store);
            Ok(())
        }
        ModelsCommand::Path => {
            println!("{}", store.dir().display());
            Ok(())
        }
    }
}

fn fetch_models(store: &ModelStore) -> Result<()> {
    if store.all_installed() {
        let corrupt = store.verify_installed()?;
        if corrupt.is_empty() {
            println!("All models already installed in {}", store.dir().display());
            return Ok(());
        }
        anyhow::bail!(
            "Installed model(s) {} fail checksum verification; delete them and re-run",
            corrupt.join(", ")
        );
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")
            .map_err(|e| anyhow::anyhow!("Invalid progress template: {e}"))?
            .progress_chars("#>-"),
    );

    let current_model = Mutex::new(String::new());
    let progress = |name: &str, downloaded: u64, total: Option<u64>| {
        let is_new_model = {
            let mut current = current_model
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if *current == name {
                false
            } else {
                *current = name.to_string();
                true
            }
        };
        if is_new_model {
            if let Some(t) = total {
                pb.set_length(t);
            }
            pb.set_message(name.to_string());
        }
        pb.set_position(downloaded);
    };

    store.ensure_models_with_progress(&progress)?;

    pb.finish_with_message("All models downloaded");
    Ok(())
}

fn list_models(store: &ModelStore) {
    let models = store.list();

    println!("Models directory: {}", store.dir().display());
    println!();

    for model in &models {
        let status = if model.installed { "✓" } else { "✗" };
        let filename = model
            .path
            .file_name()
            .map_or_else(|| "unknown".into(), |f| f.to_string_lossy());
        println!("  {status} {} ({filename}) - {}", model.name, model.description);
    }

    println!();
    let installed_count = models.iter().filter(|m| m.installed).count();
    println!("{}/{} models installed", installed_count, models.len());
}
