//! The prepared region handed to every factor extractor.

use tracing::debug;

use crate::domain::ProductStandard;
use crate::imaging::{
    circularity, contour_perimeter, foreground_mask, rgb_to_hsv, rgb_to_lab, ComponentStats,
    Components, Hsv, Mask,
};

/// Geometry of the primary object (largest foreground component).
#[derive(Debug, Clone)]
pub struct ObjectGeometry {
    /// Component statistics.
    pub stats: ComponentStats,
    /// Pixels of the component.
    pub mask: Mask,
    /// Contour length.
    pub perimeter: f32,
    /// `4πA/P²`, capped at 1.
    pub circularity: f32,
}

/// Colour planes, masks and geometry of one analysis region.
#[derive(Debug, Clone)]
pub struct Sample {
    /// RGB pixels.
    pub rgb: image::RgbImage,
    /// Luma pixels.
    pub gray: image::GrayImage,
    /// HSV per pixel, row-major.
    pub hsv: Vec<Hsv>,
    /// L*a*b* per pixel, row-major.
    pub lab: Vec<[f32; 3]>,
    /// Every pixel that differs from the background.
    pub foreground: Mask,
    /// Pixel count of the analysis frame this region was cut from.
    frame_area: u64,
    /// Primary object, if any foreground was found.
    pub object: Option<ObjectGeometry>,
    /// Pixels the factors analyze: the primary object, or the whole region
    /// when nothing stands out from the background.
    pub region: Mask,
    /// Standard for the product type, when known.
    pub standard: Option<ProductStandard>,
}

impl Sample {
    /// Builds all planes and segments the subject.
    #[must_use]
    pub fn prepare(
        rgb: image::RgbImage,
        min_contrast: f32,
        standard: Option<&ProductStandard>,
    ) -> Self {
        let gray = image::DynamicImage::ImageRgb8(rgb.clone()).to_luma8();
        let hsv = rgb.pixels().map(|p| rgb_to_hsv(p.0)).collect();
        let lab = rgb.pixels().map(|p| rgb_to_lab(p.0)).collect();

        let foreground = foreground_mask(&rgb, min_contrast);
        let components = Components::label(&foreground);
        let object = components.largest().map(|stats| {
            let mask = components.mask_of(stats.label);
            let perimeter = contour_perimeter(&mask);
            ObjectGeometry {
                stats: *stats,
                circularity: circularity(stats.area, perimeter),
                mask,
                perimeter,
            }
        });
        let region = object
            .as_ref()
            .map_or_else(|| Mask::full(rgb.width(), rgb.height()), |o| o.mask.clone());

        debug!(
            width = rgb.width(),
            height = rgb.height(),
            foreground = foreground.count(),
            components = components.len(),
            object_area = object.as_ref().map_or(0, |o| o.stats.area),
            "Prepared sample"
        );

        Self {
            gray,
            hsv,
            lab,
            frame_area: u64::from(rgb.width()) * u64::from(rgb.height()),
            foreground,
            object,
            region,
            standard: standard.cloned(),
            rgb,
        }
    }

    /// Region width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    /// Region height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    /// Marks this region as cut from a frame of `frame_area` pixels.
    #[must_use]
    pub fn within_frame(mut self, frame_area: u64) -> Self {
        self.frame_area = frame_area;
        self
    }

    /// Pixel count of the analysis frame, which is the region itself unless
    /// set by [`within_frame`](Self::within_frame).
    #[must_use]
    pub const fn frame_area(&self) -> u64 {
        self.frame_area
    }

    /// Area of the primary object, 0 when there is none.
    #[must_use]
    pub fn object_area(&self) -> u64 {
        self.object.as_ref().map_or(0, |o| o.stats.area)
    }

    /// HSV values of the analyzed region.
    pub fn region_hsv(&self) -> impl Iterator<Item = &Hsv> + '_ {
        self.hsv
            .iter()
            .enumerate()
            .filter(|(i, _)| self.region.get_index(*i))
            .map(|(_, hsv)| hsv)
    }

    /// Lab values of the analyzed region.
    pub fn region_lab(&self) -> impl Iterator<Item = &[f32; 3]> + '_ {
        self.lab
            .iter()
            .enumerate()
            .filter(|(i, _)| self.region.get_index(*i))
            .map(|(_, lab)| lab)
    }
}

#[cfg(test)]
#[allow(clippy::cast_precision_loss)]
mod tests {
    use super::*;

    fn disc_image(size: u32, r: f32) -> image::RgbImage {
        let c = size as f32 / 2.0;
        image::RgbImage::from_fn(size, size, |x, y| {
            let (dx, dy) = (x as f32 - c, y as f32 - c);
            if dx * dx + dy * dy <= r * r {
                image::Rgb([210, 25, 30])
            } else {
                image::Rgb([245, 245, 245])
            }
        })
    }

    #[test]
    fn test_prepare_disc() {
        let sample = Sample::prepare(disc_image(100, 30.0), 20.0, None);
        let object = sample.object.as_ref().unwrap();
        assert!(object.circularity > 0.8, "circularity {}", object.circularity);
        assert_eq!(sample.region.count(), object.stats.area);
        assert_eq!(sample.hsv.len(), 100 * 100);
        assert_eq!(sample.region_hsv().count() as u64, sample.object_area());
        assert!(sample.standard.is_none());
    }

    #[test]
    fn test_prepare_uniform_has_no_object() {
        let rgb = image::RgbImage::from_pixel(40, 30, image::Rgb([90, 140, 60]));
        let sample = Sample::prepare(rgb, 20.0, None);
        assert!(sample.object.is_none());
        assert_eq!(sample.object_area(), 0);
        assert_eq!(sample.region.count(), 1200);
        assert_eq!(sample.frame_area(), 1200);
    }

    #[test]
    fn test_cropped_region_keeps_frame_area() {
        let sample = Sample::prepare(disc_image(60, 20.0), 20.0, None).within_frame(400 * 400);
        assert_eq!(sample.frame_area(), 160_000);
        assert_eq!(sample.width() * sample.height(), 3600);
    }
}
