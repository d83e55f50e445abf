//! Detector weights on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use once_cell::sync::OnceCell;
use safetensors::{Dtype, SafeTensors};
use tracing::debug;

/// Builds a model from its weights.
pub type ModelBuilder<T> = Box<dyn Fn(VarBuilder) -> Result<T> + Send + Sync>;

/// Model whose weights are read on first use and kept afterwards.
pub struct LazyModel<T> {
    path: PathBuf,
    device: Device,
    builder: ModelBuilder<T>,
    cell: OnceCell<T>,
}

impl<T: Send + Sync> LazyModel<T> {
    /// Registers `path` without touching the filesystem.
    #[must_use]
    pub fn new(path: impl AsRef<Path>, device: Device, builder: ModelBuilder<T>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            device,
            builder,
            cell: OnceCell::new(),
        }
    }

    /// Path of the weights file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The built model. A failed load is retried on the next call.
    ///
    /// # Errors
    ///
    /// Returns an error if the weights cannot be read or the builder rejects them.
    pub fn get(&self) -> Result<&T> {
        self.cell.get_or_try_init(|| {
            let vb = load_safetensors(&self.path, &self.device)?;
            (self.builder)(vb)
        })
    }

    /// Whether `get` has succeeded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

/// Reads every tensor of a safetensors file onto `device`.
///
/// The returned builder hands out `f32` tensors whatever the stored float
/// width.
///
/// # Errors
///
/// Returns an error if the file is unreadable, malformed, or holds a tensor
/// type the detector cannot use.
pub fn load_safetensors(path: impl AsRef<Path>, device: &Device) -> Result<VarBuilder<'static>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read weights {}", path.display()))?;
    let file = SafeTensors::deserialize(&bytes)
        .with_context(|| format!("{} is not a safetensors file", path.display()))?;

    let mut tensors = HashMap::with_capacity(file.len());
    let mut parameters = 0usize;
    for (name, view) in file.tensors() {
        let dtype = candle_dtype(view.dtype())
            .with_context(|| format!("Tensor '{name}' in {}", path.display()))?;
        let tensor = Tensor::from_raw_buffer(view.data(), dtype, view.shape(), device)
            .with_context(|| format!("Tensor '{name}' has an inconsistent buffer"))?;
        parameters += tensor.elem_count();
        tensors.insert(name, tensor);
    }
    debug!(
        tensors = tensors.len(),
        parameters,
        "Read weights from {}",
        path.display()
    );

    Ok(VarBuilder::from_tensors(tensors, DType::F32, device))
}

fn candle_dtype(dtype: Dtype) -> Result<DType> {
    Ok(match dtype {
        Dtype::F32 => DType::F32,
        Dtype::F16 => DType::F16,
        Dtype::BF16 => DType::BF16,
        Dtype::F64 => DType::F64,
        Dtype::U8 => DType::U8,
        Dtype::U32 => DType::U32,
        Dtype::I64 => DType::I64,
        other => anyhow::bail!("unsupported tensor type {other:?}"),
    })
}
