//! Detector output.

use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl BoundingBox {
    /// Area in pixels.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Builds a pixel box from normalized `[x_min, y_min, x_max, y_max]` corners.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    #[must_use]
    pub fn from_normalized(corners: [f32; 4], width: u32, height: u32) -> Self {
        let w = width as f32;
        let h = height as f32;
        let x_min = (corners[0].clamp(0.0, 1.0) * w) as u32;
        let y_min = (corners[1].clamp(0.0, 1.0) * h) as u32;
        let x_max = (corners[2].clamp(0.0, 1.0) * w) as u32;
        let y_max = (corners[3].clamp(0.0, 1.0) * h) as u32;
        Self {
            x: x_min,
            y: y_min,
            width: x_max.saturating_sub(x_min),
            height: y_max.saturating_sub(y_min),
        }
    }

    /// Scales the box by `factor` (e.g. analysis frame back to original pixels).
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        let s = |v: u32| (v as f32 * factor).round() as u32;
        Self {
            x: s(self.x),
            y: s(self.y),
            width: s(self.width),
            height: s(self.height),
        }
    }
}

/// A detected object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label.
    #[serde(rename = "class")]
    pub label: String,
    /// Confidence (0.0 to 1.0).
    pub confidence: f32,
    /// Location in pixels of the image the detector saw.
    pub bbox: BoundingBox,
}

/// Class-name fragments that mark a detection as a defect rather than produce.
const DEFECT_KEYWORDS: &[&str] = &[
    "spot",
    "blemish",
    "bruise",
    "rot",
    "mold",
    "damage",
    "crack",
    "hole",
    "discoloration",
    "decay",
];

impl Detection {
    /// Whether the class label names a defect.
    ///
    /// Matches keywords at the start of each word so `carrot` is not `rot`.
    #[must_use]
    pub fn is_defect(&self) -> bool {
        let label = self.label.to_lowercase();
        label
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|word| DEFECT_KEYWORDS.iter().any(|k| word.starts_with(k)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(label: &str) -> Detection {
        Detection {
            label: label.to_string(),
            confidence: 0.9,
            bbox: BoundingBox {
                x: 0,
                y: 0,
                width: 10,
                height: 10,
            },
        }
    }

    #[test]
    fn test_is_defect() {
        assert!(detection("bruise").is_defect());
        assert!(detection("Soft_Rot").is_defect());
        assert!(detection("dark-spot").is_defect());
        assert!(!detection("apple").is_defect());
        assert!(!detection("produce").is_defect());
        assert!(!detection("carrot").is_defect());
        assert!(detection("spots").is_defect());
    }

    #[test]
    fn test_from_normalized() {
        let bbox = BoundingBox::from_normalized([0.25, 0.5, 0.75, 1.2], 200, 100);
        assert_eq!(bbox.x, 50);
        assert_eq!(bbox.y, 50);
        assert_eq!(bbox.width, 100);
        assert_eq!(bbox.height, 50);
    }

    #[test]
    fn test_scaled() {
        let bbox = BoundingBox {
            x: 10,
            y: 20,
            width: 30,
            height: 40,
        };
        let scaled = bbox.scaled(2.0);
        assert_eq!((scaled.x, scaled.y, scaled.width, scaled.height), (20, 40, 60, 80));
        assert_eq!(scaled.area(), 4800);
    }
}
