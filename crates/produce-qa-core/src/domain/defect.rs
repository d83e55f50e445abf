//! Defects found on the produce surface or reported by the detector.

use serde::{Deserialize, Serialize};

use super::BoundingBox;

/// A defect found during analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defect {
    /// Kind of defect.
    #[serde(rename = "type")]
    pub kind: DefectKind,
    /// How much the defect affects quality.
    pub severity: DefectSeverity,
    /// Which stage produced the defect.
    pub source: DefectSource,
    /// Kind-specific details.
    pub details: DefectDetails,
}

impl Defect {
    /// A defect found by the pixel heuristics.
    #[must_use]
    pub const fn heuristic(
        kind: DefectKind,
        severity: DefectSeverity,
        details: DefectDetails,
    ) -> Self {
        Self {
            kind,
            severity,
            source: DefectSource::Heuristic,
            details,
        }
    }
}

/// The kind of defect.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectKind {
    /// Dark patches suggesting rot or bruising.
    DarkSpots,
    /// Hue varies strongly across the produce.
    ColorInconsistency,
    /// Patches whose chroma departs from the produce's own colour.
    SurfaceBlemishes,
    /// Wrinkling or irregular texture.
    TextureIrregularity,
    /// Brown tones indicating age.
    Browning,
    /// Defect class reported by the detection model.
    Detected,
}

impl DefectKind {
    /// Stable snake-case name, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DarkSpots => "dark_spots",
            Self::ColorInconsistency => "color_inconsistency",
            Self::SurfaceBlemishes => "surface_blemishes",
            Self::TextureIrregularity => "texture_irregularity",
            Self::Browning => "browning",
            Self::Detected => "detected",
        }
    }
}

/// Severity of a single defect, or of a whole report.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DefectSeverity {
    /// No defects (report level only).
    #[default]
    None,
    /// Cosmetic.
    Low,
    /// Noticeable.
    Medium,
    /// Affects saleability.
    High,
}

impl DefectSeverity {
    /// Highest severity among `defects`, `None` when empty.
    #[must_use]
    pub fn worst(defects: &[Defect]) -> Self {
        defects
            .iter()
            .map(|d| d.severity)
            .max()
            .unwrap_or(Self::None)
    }

    /// Severity of a detector hit from its confidence.
    #[must_use]
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence >= 0.8 {
            Self::High
        } else if confidence >= 0.6 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Stage that reported a defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectSource {
    /// Pixel heuristics in the feature extractors.
    Heuristic,
    /// The detection model.
    Detector,
}

/// Defect-specific details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefectDetails {
    /// Counted patches.
    Spots {
        /// Number of patches above the minimum area.
        count: usize,
        /// Patch area as a fraction of the produce area.
        area_fraction: f32,
    },
    /// A fraction of the produce area.
    Coverage {
        /// Affected fraction of the produce area.
        fraction: f32,
    },
    /// Hue spread in degrees.
    HueSpread {
        /// Circular standard deviation of hue.
        hue_std_deg: f32,
    },
    /// Filter response energy.
    Energy {
        /// Mean squared filter response.
        energy: f32,
    },
    /// A detector hit.
    Detection {
        /// Model class label.
        label: String,
        /// Detection confidence.
        confidence: f32,
        /// Location in original image pixels.
        bbox: BoundingBox,
    },
}
