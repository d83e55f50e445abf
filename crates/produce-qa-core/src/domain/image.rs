//! Image and request types handed to the grading pipeline.

use std::path::Path;

use image::GenericImageView;

/// Basic image information extracted during loading.
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Path to the image file.
    pub path: String,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Decoded image data.
    pub image: image::DynamicImage,
}

impl ImageInfo {
    /// Wraps a decoded image, reading dimensions from it.
    #[must_use]
    pub fn new(path: impl Into<String>, image: image::DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            path: path.into(),
            width,
            height,
            image,
        }
    }

    /// File stem of the image path, used as a fallback product identifier.
    #[must_use]
    pub fn stem(&self) -> Option<String> {
        Path::new(&self.path)
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
    }
}

/// A product photo submitted for grading.
#[derive(Debug, Clone)]
pub struct GradingRequest {
    /// Marketplace product identifier, passed through to the report.
    pub product_id: String,
    /// Product type used to look up a [`ProductStandard`](super::ProductStandard).
    pub product_type: Option<String>,
    /// The photo.
    pub image: ImageInfo,
}

impl GradingRequest {
    /// Creates a request without a product type.
    #[must_use]
    pub fn new(product_id: impl Into<String>, image: ImageInfo) -> Self {
        Self {
            product_id: product_id.into(),
            product_type: None,
            image,
        }
    }

    /// Sets the product type.
    #[must_use]
    pub fn with_product_type(mut self, product_type: impl Into<String>) -> Self {
        self.product_type = Some(product_type.into());
        self
    }
}
