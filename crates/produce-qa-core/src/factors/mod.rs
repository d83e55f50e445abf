//! Factor extractors.
//!
//! Each extractor scores one [`Factor`](crate::domain::Factor) of the
//! primary object and may report defects along the way.

mod color;
mod freshness;
mod shape;
mod size;
mod surface;

pub use color::{ColorConfig, ColorFactor};
pub use freshness::{FreshnessConfig, FreshnessFactor};
pub use shape::ShapeFactor;
pub use size::SizeFactor;
pub use surface::{SurfaceConfig, SurfaceFactor};

use crate::domain::QualityFactor;

/// All five extractors. `color` also sets the freshness hue gates.
#[must_use]
pub fn default_factors(
    color: &ColorConfig,
    surface: SurfaceConfig,
) -> Vec<Box<dyn QualityFactor>> {
    vec![
        Box::new(SizeFactor),
        Box::new(ColorFactor::new(color.clone())),
        Box::new(ShapeFactor),
        Box::new(SurfaceFactor::new(surface)),
        Box::new(FreshnessFactor::new(FreshnessConfig::default()).with_color(color.clone())),
    ]
}
