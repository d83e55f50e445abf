//! Photo-condition metrics, ripeness and weight estimates.

use super::Sample;
use crate::domain::{CaptureMetrics, Ripeness};
use crate::imaging::{Histogram, Plane};

/// Below this many background pixels, uniformity is reported as neutral.
const MIN_BACKGROUND_PIXELS: u64 = 100;

/// Measures sharpness, lighting, noise and background of a whole frame.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#[must_use]
pub fn capture_metrics(frame: &Sample) -> CaptureMetrics {
    let hist = Histogram::from_luma(&frame.gray);
    let plane = Plane::from_luma(&frame.gray);

    let (_, lap_var) = plane.laplacian().mean_variance(None);
    let sharpness = (lap_var / 10.0).min(100.0);

    let coverage = hist.nonzero_bins() as f32 / 256.0 * 100.0;
    let over = hist.fraction_above(240) as f32 * 100.0;
    let under = hist.fraction_below(14) as f32 * 100.0;
    let lighting_quality = (coverage - over.max(under)).max(0.0);

    let blurred = plane.gaussian_blur(5);
    let n = plane.data().len().max(1) as f32;
    let noise_level = plane
        .data()
        .iter()
        .zip(blurred.data())
        .map(|(a, b)| (a - b).abs())
        .sum::<f32>()
        / n;

    CaptureMetrics {
        sharpness,
        brightness: hist.mean() as f32,
        contrast: hist.std_dev() as f32,
        lighting_quality,
        noise_level,
        background_uniformity: background_uniformity(frame),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn background_uniformity(frame: &Sample) -> f32 {
    let background = frame.foreground.not();
    let n = background.count();
    if n < MIN_BACKGROUND_PIXELS {
        return 50.0;
    }
    let mut sum = [0.0f64; 3];
    let mut sum_sq = [0.0f64; 3];
    for (lab, _) in frame.lab.iter().zip(background.iter()).filter(|(_, bg)| *bg) {
        for c in 0..3 {
            let v = f64::from(lab[c]);
            sum[c] += v;
            sum_sq[c] += v * v;
        }
    }
    let n = n as f64;
    let mean_std = (0..3)
        .map(|c| {
            let mean = sum[c] / n;
            (sum_sq[c] / n - mean * mean).max(0.0).sqrt()
        })
        .sum::<f64>()
        / 3.0;
    (100.0 - mean_std as f32).clamp(0.0, 100.0)
}

/// Where the subject sits in the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Composition {
    /// Whether any foreground object was found.
    pub subject_found: bool,
    /// Centroid distance from the frame centre as a fraction of the half
    /// diagonal.
    pub center_offset: f32,
    /// Whether the subject touches the frame edge.
    pub touches_edge: bool,
}

/// Locates the primary object in a whole frame.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn composition(frame: &Sample) -> Composition {
    let Some(object) = frame.object.as_ref() else {
        return Composition {
            subject_found: false,
            center_offset: 0.0,
            touches_edge: false,
        };
    };
    let (w, h) = (frame.width() as f32, frame.height() as f32);
    let (cx, cy) = object.stats.centroid();
    let half_diag = (w * w + h * h).sqrt() / 2.0;
    let offset = (cx + 0.5 - w / 2.0).hypot(cy + 0.5 - h / 2.0);
    Composition {
        subject_found: true,
        center_offset: if half_diag > 0.0 { offset / half_diag } else { 0.0 },
        touches_edge: object.stats.touches_border(frame.width(), frame.height()),
    }
}

/// Colour-based ripeness from mean saturation and value of the region.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn ripeness(sample: &Sample) -> Ripeness {
    let (n, s, v) = sample
        .region_hsv()
        .fold((0u64, 0u64, 0u64), |(n, s, v), hsv| {
            (n + 1, s + u64::from(hsv.s), v + u64::from(hsv.v))
        });
    if n == 0 {
        return Ripeness::Unknown;
    }
    let (s, v) = (s as f32 / n as f32, v as f32 / n as f32);
    if v < 100.0 {
        Ripeness::Overripe
    } else if s > 150.0 && v > 150.0 {
        Ripeness::Ripe
    } else if s < 100.0 {
        Ripeness::Underripe
    } else {
        Ripeness::Ripe
    }
}

/// Rough weight from object area and shape score, in relative units.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn estimated_weight(area: u64, shape_score: f32) -> Option<f32> {
    if area == 0 {
        return None;
    }
    let weight = area as f32 / 10_000.0 * (0.5 + 0.5 * shape_score);
    Some((weight * 100.0).round() / 100.0)
}
