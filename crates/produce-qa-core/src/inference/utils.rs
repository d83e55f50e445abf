//! Shared inference utilities.

/// Sigmoid activation function.
#[inline]
#[must_use]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Intersection over union of two `[x_min, y_min, x_max, y_max]` boxes.
#[must_use]
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Greedy non-maximum suppression.
///
/// Keeps the highest-scoring item and drops every remaining item overlapping
/// it by `threshold` IoU or more, then repeats.
pub fn nms<T>(
    mut items: Vec<T>,
    threshold: f32,
    score: impl Fn(&T) -> f32,
    corners: impl Fn(&T) -> [f32; 4],
) -> Vec<T> {
    items.sort_by(|a, b| score(b).total_cmp(&score(a)));
    let mut keep: Vec<T> = Vec::new();
    for item in items {
        let bbox = corners(&item);
        if keep.iter().all(|k| iou(&corners(k), &bbox) < threshold) {
            keep.push(item);
        }
    }
    keep
}
