//! Segmentation-based fallback detector.

use anyhow::Result;

use crate::analysis::{preprocess, PreprocessConfig};
use crate::domain::{BoundingBox, Detection, Detector};
use crate::imaging::{foreground_mask, Components};

/// Finds produce by separating it from the background, without a model.
///
/// Each foreground component covering at least `min_area_fraction` of the
/// frame becomes a `produce` detection whose confidence is the component's
/// fill ratio.
#[derive(Debug, Clone)]
pub struct HeuristicDetector {
    /// Minimum component area as a fraction of the frame.
    pub min_area_fraction: f32,
    /// Minimum colour distance from the background.
    pub min_contrast: f32,
    /// Working resolution.
    pub preprocess: PreprocessConfig,
}

impl Default for HeuristicDetector {
    fn default() -> Self {
        Self {
            min_area_fraction: 0.01,
            min_contrast: 20.0,
            preprocess: PreprocessConfig::default(),
        }
    }
}

impl Detector for HeuristicDetector {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn detect(&self, image: &image::DynamicImage) -> Result<Vec<Detection>> {
        let frame = preprocess(image, &self.preprocess);
        let (w, h) = frame.rgb.dimensions();
        let min_area = (self.min_area_fraction * (w as f32) * (h as f32)).ceil() as u64;

        let components = Components::label(&foreground_mask(&frame.rgb, self.min_contrast));
        let mut detections: Vec<Detection> = components
            .at_least(min_area.max(1))
            .map(|s| Detection {
                label: "produce".to_string(),
                confidence: s.fill_ratio(),
                bbox: BoundingBox {
                    x: s.min_x,
                    y: s.min_y,
                    width: s.width(),
                    height: s.height(),
                }
                .scaled(frame.scale),
            })
            .collect();
        detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(detections)
    }
}

#[cfg(test)]
#[allow(clippy::cast_precision_loss)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_disc_and_ignores_specks() {
        let img = image::RgbImage::from_fn(200, 200, |x, y| {
            let (dx, dy) = (x as f32 - 100.0, y as f32 - 100.0);
            if dx * dx + dy * dy <= 50.0 * 50.0 || (x < 3 && (50..53).contains(&y)) {
                image::Rgb([230, 120, 20])
            } else {
                image::Rgb([250, 250, 250])
            }
        });
        let detections = HeuristicDetector::default()
            .detect(&image::DynamicImage::ImageRgb8(img))
            .unwrap();
        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert_eq!(d.label, "produce");
        assert!((d.confidence - std::f32::consts::FRAC_PI_4).abs() < 0.05);
        assert!(!d.is_defect());
        assert!((49..=51).contains(&d.bbox.x));
    }

    #[test]
    fn test_boxes_in_original_pixels() {
        let img = image::RgbImage::from_fn(1280, 1280, |x, y| {
            if (400..880).contains(&x) && (400..880).contains(&y) {
                image::Rgb([40, 160, 40])
            } else {
                image::Rgb([250, 250, 250])
            }
        });
        let detections = HeuristicDetector::default()
            .detect(&image::DynamicImage::ImageRgb8(img))
            .unwrap();
        assert_eq!(detections.len(), 1);
        let b = detections[0].bbox;
        assert!((398..=402).contains(&b.x), "x {}", b.x);
        assert!((476..=484).contains(&b.width), "w {}", b.width);
    }

    #[test]
    fn test_uniform_image_has_no_detections() {
        let img = image::DynamicImage::new_rgb8(50, 50);
        assert!(HeuristicDetector::default().detect(&img).unwrap().is_empty());
    }
}
