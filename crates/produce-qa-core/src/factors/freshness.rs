//! Colour-based freshness indicators.

use super::color::{hue_uniformity, mean_saturation_value};
use super::ColorConfig;
use crate::analysis::Sample;
use crate::domain::{
    Defect, DefectDetails, DefectKind, DefectSeverity, Factor, FactorAssessment, QualityFactor,
};

/// Configuration for the freshness factor.
#[derive(Debug, Clone)]
pub struct FreshnessConfig {
    /// Hue interval (degrees) counted as brown.
    pub brown_hue: (f32, f32),
    /// Minimum saturation of a brown pixel.
    pub brown_min_saturation: u8,
    /// Value interval of a brown pixel.
    pub brown_value: (u8, u8),
    /// Brown fraction above which browning is reported.
    pub browning_defect_fraction: f32,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            brown_hue: (20.0, 40.0),
            brown_min_saturation: 50,
            brown_value: (50, 200),
            browning_defect_fraction: 0.15,
        }
    }
}

/// Freshness factor.
///
/// Hue uniformity uses the same saturation/value gates as the colour factor.
#[derive(Debug, Clone, Default)]
pub struct FreshnessFactor {
    config: FreshnessConfig,
    color: ColorConfig,
}

impl FreshnessFactor {
    /// Creates a freshness factor with the given configuration.
    #[must_use]
    pub fn new(config: FreshnessConfig) -> Self {
        Self {
            config,
            color: ColorConfig::default(),
        }
    }

    /// Takes the hue gates from `color`.
    #[must_use]
    pub fn with_color(mut self, color: ColorConfig) -> Self {
        self.color = color;
        self
    }
}

impl QualityFactor for FreshnessFactor {
    fn factor(&self) -> Factor {
        Factor::Freshness
    }

    #[allow(clippy::cast_precision_loss)]
    fn assess(&self, sample: &Sample) -> anyhow::Result<FactorAssessment> {
        let c = &self.config;
        let (vibrancy, brightness) = mean_saturation_value(sample);
        let (_, uniformity) =
            hue_uniformity(sample, self.color.min_saturation, self.color.min_value);

        let (total, brown) = sample.region_hsv().fold((0u64, 0u64), |(t, b), p| {
            let is_brown = (c.brown_hue.0..=c.brown_hue.1).contains(&p.h)
                && p.s >= c.brown_min_saturation
                && (c.brown_value.0..=c.brown_value.1).contains(&p.v);
            (t + 1, b + u64::from(is_brown))
        });
        let browning = if total == 0 {
            0.0
        } else {
            brown as f32 / total as f32
        };

        let score = 0.3 * vibrancy
            + 0.2 * brightness
            + 0.3 * uniformity
            + 0.2 * (1.0 - 2.0 * browning).max(0.0);
        let mut assessment = FactorAssessment::scored(score)
            .measure("vibrancy", vibrancy)
            .measure("brightness", brightness)
            .measure("uniformity", uniformity)
            .measure("browning", browning);

        if browning > c.browning_defect_fraction {
            assessment = assessment.with_defect(Defect::heuristic(
                DefectKind::Browning,
                DefectSeverity::Low,
                DefectDetails::Coverage { fraction: browning },
            ));
        }
        Ok(assessment)
    }
}
