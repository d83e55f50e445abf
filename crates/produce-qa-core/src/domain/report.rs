//! Quality report types.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::{Defect, DefectSeverity, Detection, Factor, Grade};

/// Structured output of the grading pipeline for one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// Marketplace product identifier.
    pub product_id: String,
    /// Product type the standard was looked up with.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub product_type: Option<String>,
    /// Path to the analyzed image.
    pub path: String,
    /// Timestamp of analysis (RFC 3339, UTC).
    pub timestamp: String,
    /// Original image dimensions.
    pub dimensions: ImageDimensions,
    /// Detector that produced `detections`.
    pub model_version: String,
    /// Composite score from 0 to 100.
    pub overall_score: f32,
    /// Grade derived from the score and defect count.
    pub grade: Grade,
    /// Label of `grade`.
    pub grade_label: String,
    /// Per-factor scores.
    pub factors: FactorScores,
    /// How the overall score was assembled.
    pub score_breakdown: ScoreBreakdown,
    /// Defects found.
    pub defects: Vec<Defect>,
    /// Number of defects.
    pub defect_count: usize,
    /// Worst defect severity.
    pub defect_severity: DefectSeverity,
    /// Detector output, in original image pixels.
    pub detections: Vec<Detection>,
    /// Photo-condition metrics.
    pub capture: CaptureMetrics,
    /// Named feature values from the factor extractors.
    pub measurements: BTreeMap<String, f32>,
    /// Colour-based ripeness estimate.
    pub ripeness: Ripeness,
    /// Rough weight estimate in relative units.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub estimated_weight: Option<f32>,
    /// Suggestions for better photos or handling.
    pub recommendations: Vec<String>,
    /// Wall-clock analysis time.
    pub processing_time_ms: u64,
    /// Optional EXIF metadata.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub exif: Option<HashMap<String, String>>,
}

/// Image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageDimensions {
    /// Creates dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Per-factor scores in `[0, 1]`. `None` when a factor did not run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorScores {
    /// Size score.
    pub size: Option<f32>,
    /// Colour score.
    pub color: Option<f32>,
    /// Shape score.
    pub shape: Option<f32>,
    /// Surface score.
    pub surface: Option<f32>,
    /// Freshness score.
    pub freshness: Option<f32>,
}

impl FactorScores {
    /// Returns the score for `factor`.
    #[must_use]
    pub const fn get(&self, factor: Factor) -> Option<f32> {
        match factor {
            Factor::Size => self.size,
            Factor::Color => self.color,
            Factor::Shape => self.shape,
            Factor::Surface => self.surface,
            Factor::Freshness => self.freshness,
        }
    }

    /// Sets the score for `factor`.
    pub fn set(&mut self, factor: Factor, score: f32) {
        let slot = match factor {
            Factor::Size => &mut self.size,
            Factor::Color => &mut self.color,
            Factor::Shape => &mut self.shape,
            Factor::Surface => &mut self.surface,
            Factor::Freshness => &mut self.freshness,
        };
        *slot = Some(score);
    }
}

/// Components of the overall score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Weighted factor average scaled to 0-100.
    pub weighted: f32,
    /// Points removed for defects.
    pub defect_penalty: f32,
    /// Points removed for poor capture conditions.
    pub capture_penalty: f32,
}

/// Photo-condition metrics, independent of the produce itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetrics {
    /// Laplacian-variance sharpness, 0-100.
    pub sharpness: f32,
    /// Mean luminance, 0-255.
    pub brightness: f32,
    /// Luminance standard deviation.
    pub contrast: f32,
    /// Tonal distribution minus clipping, 0-100.
    pub lighting_quality: f32,
    /// Mean absolute difference from a Gaussian-smoothed copy, 0-255.
    pub noise_level: f32,
    /// Background colour uniformity, 0-100.
    pub background_uniformity: f32,
}

/// Colour-based ripeness estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ripeness {
    /// Pale or low saturation.
    Underripe,
    /// Vivid and bright.
    Ripe,
    /// Dark.
    Overripe,
    /// No produce pixels to judge.
    #[default]
    Unknown,
}
