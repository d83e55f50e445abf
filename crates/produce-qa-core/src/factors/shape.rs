//! Roundness and proportion of the primary object.

use crate::analysis::Sample;
use crate::domain::{Factor, FactorAssessment, QualityFactor};

/// Shape factor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeFactor;

impl QualityFactor for ShapeFactor {
    fn factor(&self) -> Factor {
        Factor::Shape
    }

    fn assess(&self, sample: &Sample) -> anyhow::Result<FactorAssessment> {
        let Some(object) = sample.object.as_ref() else {
            return Ok(FactorAssessment::scored(0.5));
        };
        let circularity = object.circularity;
        let aspect = object.stats.aspect_ratio();
        let score = sample.standard.as_ref().map_or_else(
            || 0.6 * circularity + 0.4 * aspect,
            |s| 1.0 - (circularity - s.circularity).abs(),
        );
        Ok(FactorAssessment::scored(score)
            .measure("circularity", circularity)
            .measure("aspect_ratio", aspect)
            .measure("perimeter", object.perimeter))
    }
}
