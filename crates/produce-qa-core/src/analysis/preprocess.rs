//! Downscaling to the analysis frame.

use image::imageops::FilterType;
use image::GenericImageView;
use tracing::debug;

use crate::domain::BoundingBox;

/// Preprocessing settings.
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Longest side of the analysis frame in pixels.
    pub max_dimension: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { max_dimension: 640 }
    }
}

/// Image in analysis-frame resolution.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// RGB pixels.
    pub rgb: image::RgbImage,
    /// Original pixels per analysis pixel (>= 1).
    pub scale: f32,
}

/// Converts to RGB and shrinks so the longest side is at most
/// `config.max_dimension`. Never upscales.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#[must_use]
pub fn preprocess(image: &image::DynamicImage, config: &PreprocessConfig) -> Preprocessed {
    let (width, height) = image.dimensions();
    let longest = width.max(height);
    if longest <= config.max_dimension || config.max_dimension == 0 {
        return Preprocessed {
            rgb: image.to_rgb8(),
            scale: 1.0,
        };
    }

    let scale = longest as f32 / config.max_dimension as f32;
    let new_w = ((width as f32 / scale).round() as u32).max(1);
    let new_h = ((height as f32 / scale).round() as u32).max(1);
    debug!(width, height, new_w, new_h, "Downscaling for analysis");

    let resized = image.resize_exact(new_w, new_h, FilterType::Triangle);
    Preprocessed {
        rgb: resized.to_rgb8(),
        scale,
    }
}

/// Copies the part of `rgb` inside `bbox`, clipped to the image.
#[must_use]
pub fn crop(rgb: &image::RgbImage, bbox: &BoundingBox) -> image::RgbImage {
    let x = bbox.x.min(rgb.width());
    let y = bbox.y.min(rgb.height());
    let w = bbox.width.min(rgb.width() - x);
    let h = bbox.height.min(rgb.height() - y);
    image::imageops::crop_imm(rgb, x, y, w, h).to_image()
}
