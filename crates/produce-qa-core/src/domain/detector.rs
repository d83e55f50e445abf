//! Detector trait for object-detection backends.

use super::Detection;

/// An object detector run before feature extraction.
///
/// Boxes are returned in pixels of the image passed to [`Detector::detect`].
pub trait Detector: Send + Sync {
    /// Identifier recorded as the report's model version.
    fn name(&self) -> &'static str;

    /// Detects produce and defect regions.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded or inference fails.
    fn detect(&self, image: &image::DynamicImage) -> anyhow::Result<Vec<Detection>>;
}
