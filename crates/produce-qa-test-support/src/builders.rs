//! Synthetic produce photos for testing.

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use produce_qa_core::domain::ImageInfo;

/// Typical apple red.
pub const APPLE_RED: [u8; 3] = [200, 30, 35];
/// Ripe banana yellow.
pub const BANANA_YELLOW: [u8; 3] = [235, 200, 40];
/// Near-white studio backdrop.
pub const BACKDROP: [u8; 3] = [245, 245, 245];
/// Dark bruise brown.
pub const BRUISE: [u8; 3] = [45, 25, 20];

/// Builder for synthetic produce scenes.
///
/// Every scene is a flat-coloured subject on a uniform backdrop so the
/// segmentation and factor code see a predictable object.
pub struct ProduceImageBuilder;

#[allow(clippy::cast_precision_loss)]
fn inside_ellipse(x: u32, y: u32, cx: f32, cy: f32, rx: f32, ry: f32) -> bool {
    let dx = (x as f32 - cx) / rx;
    let dy = (y as f32 - cy) / ry;
    dx * dx + dy * dy <= 1.0
}

impl ProduceImageBuilder {
    // === Raw pixel scenes ===

    /// Ellipse of `fg` centred in a `width` x `height` frame of `bg`.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn ellipse(width: u32, height: u32, rx: f32, ry: f32, fg: [u8; 3], bg: [u8; 3]) -> RgbImage {
        let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
        RgbImage::from_fn(width, height, |x, y| {
            if inside_ellipse(x, y, cx, cy, rx, ry) {
                Rgb(fg)
            } else {
                Rgb(bg)
            }
        })
    }

    /// Disc of `fg` with the given radius, centred in a square frame.
    #[must_use]
    pub fn disc(size: u32, radius: f32, fg: [u8; 3], bg: [u8; 3]) -> RgbImage {
        Self::ellipse(size, size, radius, radius, fg, bg)
    }

    /// Paints filled circles of `color` at the given centres.
    #[allow(clippy::cast_precision_loss)]
    pub fn paint_spots(img: &mut RgbImage, centres: &[(u32, u32)], radius: f32, color: [u8; 3]) {
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            if centres
                .iter()
                .any(|&(cx, cy)| inside_ellipse(x, y, cx as f32, cy as f32, radius, radius))
            {
                *pixel = Rgb(color);
            }
        }
    }

    /// Adds deterministic pseudo-random noise of +/- `amplitude`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn add_noise(img: &mut RgbImage, amplitude: u8, seed: u32) {
        let mut state = seed.max(1);
        let span = u32::from(amplitude) * 2 + 1;
        for pixel in img.pixels_mut() {
            for channel in &mut pixel.0 {
                // xorshift32
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                let offset = i32::try_from(state % span).unwrap_or(0) - i32::from(amplitude);
                *channel = (i32::from(*channel) + offset).clamp(0, 255) as u8;
            }
        }
    }

    // === Produce scenes ===

    /// A clean red apple filling about a third of a square frame.
    #[must_use]
    pub fn red_apple(size: u32) -> ImageInfo {
        let img = Self::apple_pixels(size);
        ImageInfo::new("synthetic://red_apple", DynamicImage::ImageRgb8(img))
    }

    /// A red apple carrying `count` bruises, each about 150 pixels.
    ///
    /// At most eight spots are placed; they sit on a ring inside the apple.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    #[must_use]
    pub fn bruised_apple(size: u32, count: usize) -> ImageInfo {
        let mut img = Self::apple_pixels(size);
        let centre = size as f32 / 2.0;
        let ring = size as f32 * 0.18;
        let spots: Vec<(u32, u32)> = (0..count.min(8))
            .map(|i| {
                let angle = i as f32 * std::f32::consts::TAU / 8.0;
                (
                    (centre + ring * angle.cos()).round() as u32,
                    (centre + ring * angle.sin()).round() as u32,
                )
            })
            .collect();
        Self::paint_spots(&mut img, &spots, 7.0, BRUISE);
        ImageInfo::new("synthetic://bruised_apple", DynamicImage::ImageRgb8(img))
    }

    /// A yellow banana-like ellipse, three times wider than tall.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn banana(width: u32, height: u32) -> ImageInfo {
        let rx = width as f32 * 0.4;
        let img = Self::ellipse(width, height, rx, rx / 3.0, BANANA_YELLOW, BACKDROP);
        ImageInfo::new("synthetic://banana", DynamicImage::ImageRgb8(img))
    }

    /// Backdrop only, no produce.
    #[must_use]
    pub fn empty_backdrop(width: u32, height: u32) -> ImageInfo {
        Self::uniform(width, height, BACKDROP)
    }

    /// A single flat colour.
    #[must_use]
    pub fn uniform(width: u32, height: u32, color: [u8; 3]) -> ImageInfo {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        ImageInfo::new("synthetic://uniform", DynamicImage::ImageRgb8(img))
    }

    /// Black and white checkerboard, the sharpest possible texture.
    #[must_use]
    pub fn checkerboard(width: u32, height: u32, cell: u32) -> ImageInfo {
        let cell = cell.max(1);
        let img = RgbImage::from_fn(width, height, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        ImageInfo::new("synthetic://checkerboard", DynamicImage::ImageRgb8(img))
    }

    #[allow(clippy::cast_precision_loss)]
    fn apple_pixels(size: u32) -> RgbImage {
        Self::disc(size, size as f32 * 0.3, APPLE_RED, BACKDROP)
    }

    // === Files ===

    /// Writes `image` to `dir/name`; the format follows the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn save(image: &ImageInfo, dir: &Path, name: &str) -> anyhow::Result<PathBuf> {
        let path = dir.join(name);
        image.image.save(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_red_apple_layout() {
        let apple = ProduceImageBuilder::red_apple(200);
        assert_eq!((apple.width, apple.height), (200, 200));
        let rgb = apple.image.to_rgb8();
        assert_eq!(rgb.get_pixel(100, 100).0, APPLE_RED);
        assert_eq!(rgb.get_pixel(0, 0).0, BACKDROP);
    }

    #[test]
    fn test_bruised_apple_spots_inside() {
        let apple = ProduceImageBuilder::bruised_apple(200, 3);
        let rgb = apple.image.to_rgb8();
        // First spot sits on the ring at angle zero.
        assert_eq!(rgb.get_pixel(136, 100).0, BRUISE);
        let bruised = rgb.pixels().filter(|p| p.0 == BRUISE).count();
        assert!((3 * 130..=3 * 170).contains(&bruised), "bruised = {bruised}");
    }

    #[test]
    fn test_banana_is_elongated() {
        let banana = ProduceImageBuilder::banana(300, 150).image.to_rgb8();
        assert_eq!(banana.get_pixel(150, 75).0, BANANA_YELLOW);
        assert_eq!(banana.get_pixel(150, 75 + 45).0, BACKDROP);
        assert_eq!(banana.get_pixel(150 + 110, 75).0, BANANA_YELLOW);
    }

    #[test]
    fn test_noise_is_deterministic_and_bounded() {
        let mut a = RgbImage::from_pixel(16, 16, Rgb([100, 100, 100]));
        let mut b = a.clone();
        ProduceImageBuilder::add_noise(&mut a, 10, 7);
        ProduceImageBuilder::add_noise(&mut b, 10, 7);
        assert_eq!(a, b);
        assert!(a.pixels().flat_map(|p| p.0).all(|c| (90..=110).contains(&c)));
        assert!(a.pixels().any(|p| p.0 != [100, 100, 100]));
    }

    #[test]
    fn test_checkerboard_cells() {
        let board = ProduceImageBuilder::checkerboard(16, 16, 8).image.to_rgb8();
        assert_eq!(board.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(board.get_pixel(8, 0).0, [0, 0, 0]);
    }
}
