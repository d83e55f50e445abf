//! Core domain types for produce quality grading.

mod defect;
mod detection;
mod detector;
mod factor;
mod grade;
mod image;
mod report;
mod standard;

pub use defect::{Defect, DefectDetails, DefectKind, DefectSeverity, DefectSource};
pub use detection::{BoundingBox, Detection};
pub use detector::Detector;
pub use factor::{clamp_unit, Factor, FactorAssessment, QualityFactor};
pub use grade::{Grade, GradeThresholds};
pub use image::{GradingRequest, ImageInfo};
pub use report::{
    CaptureMetrics, FactorScores, ImageDimensions, QualityReport, Ripeness, ScoreBreakdown,
};
pub use standard::{HueRange, ProductStandard, StandardsCatalog, DEFAULT_DEFECT_TOLERANCE};
