//! Colour space conversions.

/// HSV pixel with hue in degrees `[0, 360)` and 8-bit saturation/value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    /// Hue in degrees.
    pub h: f32,
    /// Saturation, 0-255.
    pub s: u8,
    /// Value (brightness), 0-255.
    pub v: u8,
}

/// Converts an RGB pixel to HSV.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn rgb_to_hsv(rgb: [u8; 3]) -> Hsv {
    let [r, g, b] = rgb.map(f32::from);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta <= f32::EPSILON {
        0.0
    } else if (max - r).abs() <= f32::EPSILON {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if (max - g).abs() <= f32::EPSILON {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max <= f32::EPSILON {
        0.0
    } else {
        delta / max * 255.0
    };

    Hsv {
        h: h.rem_euclid(360.0),
        s: s.round().clamp(0.0, 255.0) as u8,
        v: max as u8,
    }
}

fn srgb_to_linear(c: u8) -> f32 {
    let c = f32::from(c) / 255.0;
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn lab_f(t: f32) -> f32 {
    const DELTA: f32 = 6.0 / 29.0;
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

/// Converts an sRGB pixel to CIE L*a*b* (D65). L is 0-100, a/b roughly ±128.
#[must_use]
pub fn rgb_to_lab(rgb: [u8; 3]) -> [f32; 3] {
    let [r, g, b] = rgb.map(srgb_to_linear);

    let x = 0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b;
    let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175 * b;
    let z = 0.019_333_9 * r + 0.119_192 * g + 0.950_304_1 * b;

    let fx = lab_f(x / 0.950_47);
    let fy = lab_f(y);
    let fz = lab_f(z / 1.088_83);

    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// Circular standard deviation of hues in degrees. 0 for an empty slice.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn circular_hue_std(hues: &[f32]) -> f32 {
    if hues.is_empty() {
        return 0.0;
    }
    let (sin, cos) = hues.iter().fold((0.0f64, 0.0f64), |(s, c), h| {
        let rad = f64::from(*h).to_radians();
        (s + rad.sin(), c + rad.cos())
    });
    let n = hues.len() as f64;
    let r = ((sin / n).powi(2) + (cos / n).powi(2)).sqrt().clamp(1e-9, 1.0);
    #[allow(clippy::cast_possible_truncation)]
    let std = (-2.0 * r.ln()).sqrt().to_degrees() as f32;
    std.min(180.0)
}
