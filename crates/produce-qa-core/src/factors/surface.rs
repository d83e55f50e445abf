//! Surface smoothness and the pixel-level defect heuristics.

use tracing::debug;

use crate::analysis::Sample;
use crate::domain::{
    Defect, DefectDetails, DefectKind, DefectSeverity, Factor, FactorAssessment, QualityFactor,
    DEFAULT_DEFECT_TOLERANCE,
};
use crate::imaging::filters::gabor_kernel;
use crate::imaging::{Components, Mask, Plane};

const GABOR_SIZE: usize = 15;

/// Configuration for surface analysis and defect heuristics.
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    /// Luma below which a produce pixel counts as dark (0-255).
    pub dark_threshold: u8,
    /// Minimum dark patch area in pixels.
    pub min_spot_area: u64,
    /// More spots than this is a high-severity defect.
    pub high_spot_count: usize,
    /// Above this dark fraction the produce is dark by nature and spots are not reported.
    pub max_dark_fraction: f32,
    /// Lab chroma distance from the produce's median colour marking a blemish pixel.
    pub blemish_chroma_delta: f32,
    /// Mean squared Gabor response above which texture is irregular.
    pub texture_energy_threshold: f32,
    /// Sobel magnitude counted as an edge.
    pub edge_threshold: f32,
    /// Pixels trimmed from the object boundary before smoothness is measured.
    pub boundary_margin: u32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            dark_threshold: 60,
            min_spot_area: 100,
            high_spot_count: 5,
            max_dark_fraction: 0.6,
            blemish_chroma_delta: 27.0,
            texture_energy_threshold: 1000.0,
            edge_threshold: 100.0,
            boundary_margin: 3,
        }
    }
}

impl SurfaceConfig {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.max_dark_fraction) {
            return Err(format!(
                "surface.max_dark_fraction must be 0.0-1.0, got {}",
                self.max_dark_fraction
            ));
        }
        if self.blemish_chroma_delta <= 0.0 {
            return Err(format!(
                "surface.blemish_chroma_delta must be positive, got {}",
                self.blemish_chroma_delta
            ));
        }
        if self.texture_energy_threshold <= 0.0 {
            return Err(format!(
                "surface.texture_energy_threshold must be positive, got {}",
                self.texture_energy_threshold
            ));
        }
        Ok(())
    }
}

/// Surface factor.
#[derive(Debug, Clone, Default)]
pub struct SurfaceFactor {
    config: SurfaceConfig,
}

impl SurfaceFactor {
    /// Creates a surface factor with the given configuration.
    #[must_use]
    pub const fn new(config: SurfaceConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    #[allow(clippy::cast_precision_loss)]
    fn dark_spots(&self, sample: &Sample) -> Option<Defect> {
        let region_area = sample.region.count();
        let threshold = self.config.dark_threshold;
        let dark = Mask::from_fn(sample.width(), sample.height(), |x, y| {
            sample.gray.get_pixel(x, y).0[0] < threshold
        })
        .and(&sample.region);
        let dark_area = dark.count();
        if region_area == 0 || dark_area == 0 {
            return None;
        }
        if dark_area as f32 > self.config.max_dark_fraction * region_area as f32 {
            debug!(dark_area, region_area, "Produce is dark overall, skipping spot check");
            return None;
        }

        let components = Components::label(&dark);
        let (count, spot_area) = components
            .at_least(self.config.min_spot_area)
            .fold((0usize, 0u64), |(n, a), s| (n + 1, a + s.area));
        if count == 0 {
            return None;
        }
        let severity = if count > self.config.high_spot_count {
            DefectSeverity::High
        } else {
            DefectSeverity::Medium
        };
        Some(Defect::heuristic(
            DefectKind::DarkSpots,
            severity,
            DefectDetails::Spots {
                count,
                area_fraction: spot_area as f32 / region_area as f32,
            },
        ))
    }

    /// Fraction of region pixels whose chroma departs from the median.
    #[allow(clippy::cast_precision_loss)]
    fn blemish_fraction(&self, sample: &Sample) -> f32 {
        let chroma: Vec<(f32, f32)> = sample.region_lab().map(|lab| (lab[1], lab[2])).collect();
        if chroma.is_empty() {
            return 0.0;
        }
        let median_a = median(chroma.iter().map(|c| c.0).collect());
        let median_b = median(chroma.iter().map(|c| c.1).collect());
        let off = chroma
            .iter()
            .filter(|(a, b)| (a - median_a).hypot(b - median_b) > self.config.blemish_chroma_delta)
            .count();
        off as f32 / chroma.len() as f32
    }
}

/// The analyzed region minus a `margin`-pixel band along the object
/// boundary, so filters do not respond to the silhouette.
fn interior(sample: &Sample, margin: u32) -> Mask {
    if sample.object.is_none() {
        return sample.region.clone();
    }
    let eroded = sample.region.erode(margin);
    if eroded.count() == 0 {
        sample.region.clone()
    } else {
        eroded
    }
}

fn median(mut values: Vec<f32>) -> f32 {
    values.sort_by(f32::total_cmp);
    values.get(values.len() / 2).copied().unwrap_or(0.0)
}

impl QualityFactor for SurfaceFactor {
    fn factor(&self) -> Factor {
        Factor::Surface
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn assess(&self, sample: &Sample) -> anyhow::Result<FactorAssessment> {
        let inner = interior(sample, self.config.boundary_margin);
        let inner_area = inner.count().max(1) as f32;

        let gray = Plane::from_luma(&sample.gray);
        let (_, lap_var) = gray.gaussian_blur(5).laplacian().mean_variance(Some(&inner));
        let smoothness = 1.0 - (lap_var / 1000.0).min(1.0);

        let edges = gray
            .sobel_magnitude()
            .masked(Some(&inner))
            .filter(|&m| m > self.config.edge_threshold)
            .count();
        let edge_density = edges as f32 / inner_area;

        let mut kernel = gabor_kernel(GABOR_SIZE, 3.0, 0.0, 10.0, 0.5, 0.0);
        let dc = kernel.iter().sum::<f32>() / kernel.len() as f32;
        kernel.iter_mut().for_each(|k| *k -= dc);
        let texture_region = interior(sample, GABOR_SIZE as u32 / 2);
        let energy = gray
            .convolve(&kernel, GABOR_SIZE)
            .map(|r| r.clamp(0.0, 255.0))
            .masked(Some(&texture_region))
            .map(|r| r * r)
            .sum::<f32>()
            / texture_region.count().max(1) as f32;

        let score = 0.7 * smoothness + 0.3 * (1.0 - edge_density);
        let blemish_fraction = self.blemish_fraction(sample);
        let mut assessment = FactorAssessment::scored(score)
            .measure("laplacian_variance", lap_var)
            .measure("smoothness", smoothness)
            .measure("edge_density", edge_density)
            .measure("texture_energy", energy)
            .measure("blemish_fraction", blemish_fraction);

        if let Some(spots) = self.dark_spots(sample) {
            assessment = assessment.with_defect(spots);
        }

        let tolerance = sample
            .standard
            .as_ref()
            .map_or(DEFAULT_DEFECT_TOLERANCE, |s| s.defect_tolerance);
        if blemish_fraction > tolerance {
            let severity = if blemish_fraction > 3.0 * tolerance {
                DefectSeverity::High
            } else {
                DefectSeverity::Medium
            };
            assessment = assessment.with_defect(Defect::heuristic(
                DefectKind::SurfaceBlemishes,
                severity,
                DefectDetails::Coverage {
                    fraction: blemish_fraction,
                },
            ));
        }

        if energy > self.config.texture_energy_threshold {
            assessment = assessment.with_defect(Defect::heuristic(
                DefectKind::TextureIrregularity,
                DefectSeverity::Low,
                DefectDetails::Energy { energy },
            ));
        }

        Ok(assessment)
    }
}

#[cfg(test)]
#[allow(clippy::cast_precision_loss)]
mod tests {
    use super::*;

    const BG: [u8; 3] = [245, 245, 245];

    fn apple(spots: &[(f32, f32)]) -> image::RgbImage {
        image::RgbImage::from_fn(160, 160, |x, y| {
            let (fx, fy) = (x as f32, y as f32);
            let (dx, dy) = (fx - 80.0, fy - 80.0);
            if dx * dx + dy * dy > 60.0 * 60.0 {
                return image::Rgb(BG);
            }
            let in_spot = spots
                .iter()
                .any(|(sx, sy)| (fx - sx).powi(2) + (fy - sy).powi(2) <= 49.0);
            if in_spot {
                image::Rgb([40, 20, 15])
            } else {
                image::Rgb([200, 30, 35])
            }
        })
    }

    #[test]
    fn test_clean_surface_is_smooth() {
        let sample = Sample::prepare(apple(&[]), 20.0, None);
        let a = SurfaceFactor::default().assess(&sample).unwrap();
        assert!(a.score > 0.95, "score {}", a.score);
        assert!(a.defects.is_empty(), "{:?}", a.defects);
    }

    #[test]
    fn test_dark_spots_detected() {
        let sample = Sample::prepare(apple(&[(60.0, 60.0), (100.0, 90.0)]), 20.0, None);
        let a = SurfaceFactor::default().assess(&sample).unwrap();
        let spots = a.defects.iter().find(|d| d.kind == DefectKind::DarkSpots).unwrap();
        assert_eq!(spots.severity, DefectSeverity::Medium);
        assert!(matches!(spots.details, DefectDetails::Spots { count: 2, .. }));
    }

    #[test]
    fn test_many_spots_are_high_severity() {
        let spots: Vec<(f32, f32)> = (0..6)
            .map(|i| (50.0 + 18.0 * (i % 3) as f32, 65.0 + 25.0 * (i / 3) as f32))
            .collect();
        let sample = Sample::prepare(apple(&spots), 20.0, None);
        let a = SurfaceFactor::default().assess(&sample).unwrap();
        let spots = a.defects.iter().find(|d| d.kind == DefectKind::DarkSpots).unwrap();
        assert_eq!(spots.severity, DefectSeverity::High);
    }

    #[test]
    fn test_dark_produce_not_reported_as_spotted() {
        let rgb = image::RgbImage::from_fn(100, 100, |x, y| {
            let (dx, dy) = (x as f32 - 50.0, y as f32 - 50.0);
            if dx * dx + dy * dy <= 35.0 * 35.0 {
                image::Rgb([45, 20, 50])
            } else {
                image::Rgb(BG)
            }
        });
        let a = SurfaceFactor::default()
            .assess(&Sample::prepare(rgb, 20.0, None))
            .unwrap();
        assert!(!a.defects.iter().any(|d| d.kind == DefectKind::DarkSpots));
    }

    #[test]
    fn test_noisy_surface_scores_lower() {
        let rgb = image::RgbImage::from_fn(120, 120, |x, y| {
            let (dx, dy) = (x as f32 - 60.0, y as f32 - 60.0);
            if dx * dx + dy * dy > 50.0 * 50.0 {
                image::Rgb(BG)
            } else if (x / 5) % 2 == 0 {
                image::Rgb([220, 160, 60])
            } else {
                image::Rgb([120, 60, 10])
            }
        });
        let sample = Sample::prepare(rgb, 20.0, None);
        let rough = SurfaceFactor::default().assess(&sample).unwrap();
        let smooth = SurfaceFactor::default()
            .assess(&Sample::prepare(apple(&[]), 20.0, None))
            .unwrap();
        assert!(rough.score < smooth.score);
        assert!(rough
            .defects
            .iter()
            .any(|d| d.kind == DefectKind::TextureIrregularity));
    }

    #[test]
    fn test_config_validation() {
        assert!(SurfaceConfig::default().validate().is_ok());
        let bad = SurfaceConfig {
            max_dark_fraction: 1.5,
            ..SurfaceConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
