//! Quality factor trait for the weighted grading factors.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Defect;
use crate::analysis::Sample;

/// The five factors combined into the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    /// Object size relative to the frame or the product standard.
    Size,
    /// Colour uniformity, vibrancy and match to the expected colour.
    Color,
    /// Roundness and proportion.
    Shape,
    /// Surface smoothness.
    Surface,
    /// Colour-based freshness indicators.
    Freshness,
}

impl Factor {
    /// All factors in report order.
    pub const ALL: [Self; 5] = [
        Self::Size,
        Self::Color,
        Self::Shape,
        Self::Surface,
        Self::Freshness,
    ];

    /// Snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Color => "color",
            Self::Shape => "shape",
            Self::Surface => "surface",
            Self::Freshness => "freshness",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one factor.
#[derive(Debug, Clone, Default)]
pub struct FactorAssessment {
    /// Score from 0.0 (poor) to 1.0 (ideal).
    pub score: f32,
    /// Defects found while computing the factor.
    pub defects: Vec<Defect>,
    /// Named feature values, reported as `<factor>.<name>`.
    pub measurements: Vec<(&'static str, f32)>,
}

impl FactorAssessment {
    /// An assessment with only a score. The score is clamped to `[0, 1]`.
    #[must_use]
    pub fn scored(score: f32) -> Self {
        Self {
            score: clamp_unit(score),
            ..Self::default()
        }
    }

    /// Adds a measurement.
    #[must_use]
    pub fn measure(mut self, name: &'static str, value: f32) -> Self {
        self.measurements.push((name, value));
        self
    }

    /// Adds a defect.
    #[must_use]
    pub fn with_defect(mut self, defect: Defect) -> Self {
        self.defects.push(defect);
        self
    }
}

/// Clamps to `[0, 1]`, mapping NaN to 0.
#[must_use]
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Trait for the factor extractors.
///
/// Each factor reads the prepared [`Sample`] and scores one aspect of the
/// produce.
pub trait QualityFactor: Send + Sync {
    /// Which factor this extractor scores.
    fn factor(&self) -> Factor;

    /// Name used in logs and measurement keys.
    fn name(&self) -> &'static str {
        self.factor().as_str()
    }

    /// Scores the sample.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample cannot be analyzed.
    fn assess(&self, sample: &Sample) -> anyhow::Result<FactorAssessment>;
}
