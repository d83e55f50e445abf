//! Model downloading and caching adapter.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

/// Placeholder checksum indicating verification should be skipped.
const PLACEHOLDER_CHECKSUM: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Release location of the published weights.
pub const DEFAULT_BASE_URL: &str =
    "https://github.com/produce-qa/produce-qa/releases/download/models-v1";

const CHUNK_SIZE: usize = 64 * 1024;

/// Model metadata.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Model name/identifier.
    pub name: &'static str,
    /// Short description shown by `models list`.
    pub description: &'static str,
    /// Expected SHA256 hash. All zeros skips verification.
    pub sha256: &'static str,
    /// Filename in the models directory and under the base URL.
    pub filename: &'static str,
}

/// Known models.
pub const MODELS: &[ModelInfo] = &[ModelInfo {
    name: "produce-ssd",
    description: "Produce and defect detector (128x128 single-shot)",
    sha256: PLACEHOLDER_CHECKSUM,
    filename: "produce-ssd.safetensors",
}];

/// Looks up a known model by name.
#[must_use]
pub fn find_model(name: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.name == name)
}

/// Download progress: model name, bytes so far, total bytes if known.
pub type ProgressCallback<'a> = &'a dyn Fn(&str, u64, Option<u64>);

/// Installation state of one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStatus {
    /// Model name.
    pub name: &'static str,
    /// Model description.
    pub description: &'static str,
    /// Where the model lives or would be installed.
    pub path: PathBuf,
    /// Whether the file exists.
    pub installed: bool,
}

/// Returns the default models directory path.
///
/// Uses `XDG_DATA_HOME/produce-qa/models` or `~/.local/share/produce-qa/models`.
#[must_use]
pub fn models_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("produce-qa")
        .join("models")
}

/// A directory of model files plus where to fetch missing ones.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
    base_url: String,
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new(models_dir())
    }
}

impl ModelStore {
    /// Creates a store rooted at `dir` that downloads from [`DEFAULT_BASE_URL`].
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Uses a different download location (e.g. a mirror).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The models directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path to a specific model file.
    #[must_use]
    pub fn model_path(&self, name: &str) -> Option<PathBuf> {
        find_model(name).map(|m| self.dir.join(m.filename))
    }

    /// Returns the path of an installed model, `None` if unknown or missing.
    #[must_use]
    pub fn installed_path(&self, name: &str) -> Option<PathBuf> {
        self.model_path(name).filter(|p| p.is_file())
    }

    /// Checks if all models are installed.
    #[must_use]
    pub fn all_installed(&self) -> bool {
        MODELS.iter().all(|m| self.dir.join(m.filename).is_file())
    }

    /// Lists known models with their status.
    #[must_use]
    pub fn list(&self) -> Vec<ModelStatus> {
        MODELS
            .iter()
            .map(|m| {
                let path = self.dir.join(m.filename);
                ModelStatus {
                    name: m.name,
                    description: m.description,
                    installed: path.is_file(),
                    path,
                }
            })
            .collect()
    }

    /// Ensures all models are present, downloading missing ones.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The models directory cannot be created
    /// - A model download fails
    /// - A model's checksum doesn't match
    pub fn ensure_models(&self) -> Result<()> {
        self.ensure_models_with_progress(&|_, _, _| {})
    }

    /// Like [`ensure_models`](Self::ensure_models), reporting download progress.
    ///
    /// # Errors
    ///
    /// See [`ensure_models`](Self::ensure_models).
    pub fn ensure_models_with_progress(&self, progress: ProgressCallback<'_>) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create models directory {}", self.dir.display())
        })?;

        for model in MODELS {
            let path = self.dir.join(model.filename);
            if path.is_file() {
                debug!("Model {} already exists", model.name);
            } else {
                self.download_model(model, &path, progress)?;
            }
        }

        Ok(())
    }

    /// Downloads a model from the base URL, writing it atomically.
    fn download_model(
        &self,
        model: &ModelInfo,
        path: &Path,
        progress: ProgressCallback<'_>,
    ) -> Result<()> {
        let url = format!("{}/{}", self.base_url, model.filename);
        info!("Downloading model {} from {url}", model.name);

        let mut response = reqwest::blocking::get(&url)
            .with_context(|| format!("Failed to download {}", model.name))?;

        if !response.status().is_success() {
            anyhow::bail!("Download failed with status: {}", response.status());
        }

        let total = response.content_length();
        let mut bytes = Vec::with_capacity(usize::try_from(total.unwrap_or(0)).unwrap_or(0));
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            let n = response
                .read(&mut chunk)
                .with_context(|| format!("Failed to read response for {}", model.name))?;
            if n == 0 {
                break;
            }
            bytes.extend_from_slice(&chunk[..n]);
            progress(model.name, bytes.len() as u64, total);
        }

        verify_checksum(model, &bytes, path)?;

        let partial = path.with_extension("part");
        let mut file = fs::File::create(&partial)
            .with_context(|| format!("Failed to create {}", partial.display()))?;
        file.write_all(&bytes)
            .with_context(|| format!("Failed to write {}", model.name))?;
        fs::rename(&partial, path)
            .with_context(|| format!("Failed to move {} into place", model.name))?;

        info!("Downloaded {} ({} bytes)", model.name, bytes.len());
        Ok(())
    }

    /// Re-hashes installed models against their published checksums.
    ///
    /// Returns the names of installed models whose contents do not match.
    ///
    /// # Errors
    ///
    /// Returns an error if an installed file cannot be read.
    pub fn verify_installed(&self) -> Result<Vec<&'static str>> {
        let mut corrupt = Vec::new();
        for model in MODELS {
            let path = self.dir.join(model.filename);
            if !path.is_file() {
                continue;
            }
            let bytes =
                fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
            if verify_checksum(model, &bytes, &path).is_err() {
                warn!("Installed model {} fails checksum", model.name);
                corrupt.push(model.name);
            }
        }
        Ok(corrupt)
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn verify_checksum(model: &ModelInfo, bytes: &[u8], path: &Path) -> Result<()> {
    if model.sha256 == PLACEHOLDER_CHECKSUM {
        debug!(
            "Skipping checksum verification for {} (placeholder checksum)",
            model.name
        );
        return Ok(());
    }

    let hash = sha256_hex(bytes);
    if hash != model.sha256 {
        anyhow::bail!(
            "Checksum mismatch for {}: expected {}, got {}. \
             Try deleting {} and re-running to download a fresh copy.",
            model.name,
            model.sha256,
            hash,
            path.display()
        );
    }
    Ok(())
}
