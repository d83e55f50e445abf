//! Colour uniformity, vibrancy and match to the expected colour.

use crate::analysis::Sample;
use crate::domain::{
    Defect, DefectDetails, DefectKind, DefectSeverity, Factor, FactorAssessment, QualityFactor,
};
use crate::imaging::circular_hue_std;

/// Configuration for the colour factor.
#[derive(Debug, Clone)]
pub struct ColorConfig {
    /// Hue spread (degrees) above which colour is reported as inconsistent.
    pub inconsistency_deg: f32,
    /// Minimum saturation (0-255) for a pixel's hue to count.
    pub min_saturation: u8,
    /// Minimum value (0-255) for a pixel's hue to count.
    pub min_value: u8,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            inconsistency_deg: 60.0,
            min_saturation: 38,
            min_value: 26,
        }
    }
}

/// Hue spread of the sufficiently saturated region pixels, and the
/// uniformity score derived from it.
pub(super) fn hue_uniformity(sample: &Sample, min_saturation: u8, min_value: u8) -> (f32, f32) {
    let hues: Vec<f32> = sample
        .region_hsv()
        .filter(|p| p.s >= min_saturation && p.v >= min_value)
        .map(|p| p.h)
        .collect();
    let std = circular_hue_std(&hues);
    (std, 1.0 - (std / 180.0).min(1.0))
}

/// Mean saturation and value of the region, both normalized to `[0, 1]`.
#[allow(clippy::cast_precision_loss)]
pub(super) fn mean_saturation_value(sample: &Sample) -> (f32, f32) {
    let (n, s, v) = sample
        .region_hsv()
        .fold((0u64, 0u64, 0u64), |(n, s, v), p| {
            (n + 1, s + u64::from(p.s), v + u64::from(p.v))
        });
    if n == 0 {
        return (0.0, 0.0);
    }
    let n = n as f32 * 255.0;
    (s as f32 / n, v as f32 / n)
}

/// Colour factor.
#[derive(Debug, Clone, Default)]
pub struct ColorFactor {
    config: ColorConfig,
}

impl ColorFactor {
    /// Creates a colour factor with the given configuration.
    #[must_use]
    pub const fn new(config: ColorConfig) -> Self {
        Self { config }
    }
}

impl QualityFactor for ColorFactor {
    fn factor(&self) -> Factor {
        Factor::Color
    }

    #[allow(clippy::cast_precision_loss)]
    fn assess(&self, sample: &Sample) -> anyhow::Result<FactorAssessment> {
        let (hue_std, uniformity) =
            hue_uniformity(sample, self.config.min_saturation, self.config.min_value);
        let (saturation, brightness) = mean_saturation_value(sample);
        let generic = 0.4 * uniformity + 0.3 * brightness + 0.3 * saturation;

        let accuracy = sample.standard.as_ref().map(|standard| {
            let (total, matching) = sample.region_hsv().fold((0u64, 0u64), |(t, m), p| {
                (t + 1, m + u64::from(standard.matches_color(p.h, p.s, p.v)))
            });
            if total == 0 {
                0.0
            } else {
                (2.0 * matching as f32 / total as f32).min(1.0)
            }
        });

        let score = accuracy.map_or(generic, |a| (generic + a) / 2.0);
        let mut assessment = FactorAssessment::scored(score)
            .measure("hue_std", hue_std)
            .measure("uniformity", uniformity)
            .measure("brightness", brightness)
            .measure("saturation", saturation);
        if let Some(accuracy) = accuracy {
            assessment = assessment.measure("accuracy", accuracy);
        }

        if hue_std > self.config.inconsistency_deg {
            assessment = assessment.with_defect(Defect::heuristic(
                DefectKind::ColorInconsistency,
                DefectSeverity::Medium,
                DefectDetails::HueSpread {
                    hue_std_deg: hue_std,
                },
            ));
        }
        Ok(assessment)
    }
}
