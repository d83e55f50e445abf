//! Produce QA Adapters - External adapters for produce-qa.
//!
//! This crate provides adapters for:
//! - Filesystem image source with EXIF orientation
//! - Model downloading and caching

pub mod fs;
pub mod models;

pub use fs::{exif_metadata, load_image, FsImageSource};
pub use models::{models_dir, ModelStatus, ModelStore, ProgressCallback};
