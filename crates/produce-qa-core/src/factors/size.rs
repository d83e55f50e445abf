//! Object size relative to the frame or the expected range.

use crate::analysis::Sample;
use crate::domain::{Factor, FactorAssessment, QualityFactor};

/// Size factor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeFactor;

/// Score for an area against an expected `[lo, hi]` range.
fn range_score(area: f32, (lo, hi): (f32, f32)) -> f32 {
    if area < lo {
        1.0 - (lo - area) / lo
    } else if area > hi {
        1.0 - (area - hi) / hi
    } else {
        1.0
    }
}

impl QualityFactor for SizeFactor {
    fn factor(&self) -> Factor {
        Factor::Size
    }

    #[allow(clippy::cast_precision_loss)]
    fn assess(&self, sample: &Sample) -> anyhow::Result<FactorAssessment> {
        let area = sample.object_area();
        if area == 0 {
            return Ok(FactorAssessment::scored(0.5).measure("area", 0.0));
        }
        let area = area as f32;
        let frame_fraction = area / sample.frame_area().max(1) as f32;
        let score = sample.standard.as_ref().map_or_else(
            || (2.0 * frame_fraction).min(1.0),
            |s| range_score(area, s.size_range),
        );
        Ok(FactorAssessment::scored(score)
            .measure("area", area)
            .measure("frame_fraction", frame_fraction))
    }
}

#[cfg(test)]
#[allow(clippy::cast_precision_loss)]
mod tests {
    use super::*;
    use crate::domain::StandardsCatalog;

    fn square(frame: u32, side: u32) -> image::RgbImage {
        let off = (frame - side) / 2;
        image::RgbImage::from_fn(frame, frame, |x, y| {
            if (off..off + side).contains(&x) && (off..off + side).contains(&y) {
                image::Rgb([200, 120, 20])
            } else {
                image::Rgb([250, 250, 250])
            }
        })
    }

    #[test]
    fn test_range_score() {
        assert!((range_score(50.0, (10.0, 100.0)) - 1.0).abs() < 1e-6);
        assert!((range_score(5.0, (10.0, 100.0)) - 0.5).abs() < 1e-6);
        assert!((range_score(150.0, (10.0, 100.0)) - 0.5).abs() < 1e-6);
        assert!(range_score(500.0, (10.0, 100.0)) < 0.0);
    }

    #[test]
    fn test_generic_size_from_frame_fraction() {
        let sample = Sample::prepare(square(100, 50), 20.0, None);
        let a = SizeFactor.assess(&sample).unwrap();
        assert!((a.score - 0.5).abs() < 1e-3, "score {}", a.score);

        let big = Sample::prepare(square(100, 80), 20.0, None);
        assert!((SizeFactor.assess(&big).unwrap().score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cropped_region_scored_against_frame() {
        // 40x40 object in a 60x60 crop of a 200x200 frame.
        let crop = Sample::prepare(square(60, 40), 20.0, None);
        let alone = SizeFactor.assess(&crop).unwrap().score;
        assert!(alone > 0.8, "score {alone}");

        let a = SizeFactor.assess(&crop.within_frame(200 * 200)).unwrap();
        assert!((a.score - 0.08).abs() < 1e-3, "score {}", a.score);
        let fraction = a
            .measurements
            .iter()
            .find(|(name, _)| *name == "frame_fraction")
            .map(|(_, v)| *v)
            .unwrap();
        assert!((fraction - 0.04).abs() < 1e-4);
    }

    #[test]
    fn test_size_against_standard() {
        let catalog = StandardsCatalog::builtin();
        // 100x100 = 10 000 px, inside the orange range.
        let ok = Sample::prepare(square(200, 100), 20.0, catalog.get("orange"));
        assert!((SizeFactor.assess(&ok).unwrap().score - 1.0).abs() < 1e-6);
        // 40x40 = 1 600 px, well under the orange minimum.
        let small = Sample::prepare(square(200, 40), 20.0, catalog.get("orange"));
        let score = SizeFactor.assess(&small).unwrap().score;
        assert!((score - 0.4).abs() < 1e-3, "score {score}");
    }

    #[test]
    fn test_no_object_is_neutral() {
        let rgb = image::RgbImage::from_pixel(50, 50, image::Rgb([30, 30, 30]));
        let a = SizeFactor.assess(&Sample::prepare(rgb, 20.0, None)).unwrap();
        assert!((a.score - 0.5).abs() < f32::EPSILON);
    }
}
