//! Photography and handling advice derived from a graded image.

use crate::analysis::Composition;
use crate::domain::CaptureMetrics;

/// Facts the advice is based on.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationInput<'a> {
    /// Photo-condition metrics of the whole frame.
    pub capture: &'a CaptureMetrics,
    /// Subject placement in the frame.
    pub composition: &'a Composition,
    /// Fraction of produce pixels in the expected colour range (0-1), when a
    /// product standard applied.
    pub color_accuracy: Option<f32>,
}

/// Lists concrete suggestions, most important first. Empty for a good photo.
#[must_use]
pub fn recommend(input: &RecommendationInput<'_>) -> Vec<String> {
    let capture = input.capture;
    let composition = input.composition;
    let mut out: Vec<&str> = Vec::new();

    if capture.sharpness < 50.0 {
        out.push("Use a tripod or stabilize the camera to reduce blur");
        out.push("Ensure proper focus on the product");
    }
    if capture.lighting_quality < 60.0 {
        out.push("Improve lighting: use natural light or additional lighting");
        out.push("Avoid harsh shadows and direct flash");
    }
    if capture.background_uniformity < 70.0 {
        out.push("Use a plain, neutral background");
        out.push("Remove clutter from the background");
    }
    if input.color_accuracy.is_some_and(|a| a < 0.7) {
        out.push("Ensure accurate color representation");
        out.push("Check white balance settings");
    }
    if capture.noise_level > 20.0 {
        out.push("Reduce ISO settings to minimize noise");
        out.push("Use better lighting instead of high ISO");
    }

    if !composition.subject_found {
        out.push("No product found: photograph it against a contrasting background");
    } else {
        if composition.center_offset > 0.25 {
            out.push("Center the product in the frame");
        }
        if composition.touches_edge {
            out.push("Ensure the entire product is visible");
        }
    }

    out.into_iter().map(str::to_string).collect()
}
