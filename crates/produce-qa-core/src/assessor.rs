//! The end-to-end grading pipeline.

use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::{Context, Result};
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, warn};

use crate::analysis::{
    capture_metrics, composition, crop, estimated_weight, preprocess, ripeness, PreprocessConfig,
    Sample,
};
use crate::domain::{
    BoundingBox, Defect, DefectDetails, DefectKind, DefectSeverity, DefectSource, Detection,
    Detector, Factor, FactorScores, GradingRequest, ImageDimensions, QualityFactor, QualityReport,
    StandardsCatalog,
};
use crate::factors::{default_factors, ColorConfig, SurfaceConfig};
use crate::scoring::{recommend, RecommendationInput, ScoringPolicy};

/// Pipeline settings outside the scoring policy.
#[derive(Debug, Clone)]
pub struct AssessorConfig {
    /// Analysis resolution.
    pub preprocess: PreprocessConfig,
    /// Minimum colour distance from the background for foreground pixels.
    pub min_contrast: f32,
    /// Padding added on each side of the detected produce box, as a fraction
    /// of its size.
    pub roi_padding: f32,
}

impl Default for AssessorConfig {
    fn default() -> Self {
        Self {
            preprocess: PreprocessConfig::default(),
            min_contrast: 20.0,
            roi_padding: 0.05,
        }
    }
}

/// Grades product photos.
pub struct QualityAssessor {
    factors: Vec<Box<dyn QualityFactor>>,
    detector: Option<Box<dyn Detector>>,
    catalog: StandardsCatalog,
    policy: ScoringPolicy,
    config: AssessorConfig,
}

/// Boxes smaller than this (analysis pixels per side) are not used as a region.
const MIN_ROI_SIDE: u32 = 16;

impl QualityAssessor {
    /// Creates an assessor with the default factors, the built-in standards
    /// and no detector.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy is invalid.
    pub fn new(policy: ScoringPolicy) -> Result<Self> {
        policy
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid scoring policy: {e}"))?;
        Ok(Self {
            factors: default_factors(&ColorConfig::default(), SurfaceConfig::default()),
            detector: None,
            catalog: StandardsCatalog::builtin(),
            policy,
            config: AssessorConfig::default(),
        })
    }

    /// Uses `detector` for object and defect detection.
    #[must_use]
    pub fn with_detector(mut self, detector: Box<dyn Detector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Replaces the product standards.
    #[must_use]
    pub fn with_catalog(mut self, catalog: StandardsCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Replaces the factor extractors.
    #[must_use]
    pub fn with_factors(mut self, factors: Vec<Box<dyn QualityFactor>>) -> Self {
        self.factors = factors;
        self
    }

    /// Replaces the pipeline settings.
    #[must_use]
    pub fn with_config(mut self, config: AssessorConfig) -> Self {
        self.config = config;
        self
    }

    /// The scoring policy.
    #[must_use]
    pub const fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// The product standards.
    #[must_use]
    pub const fn catalog(&self) -> &StandardsCatalog {
        &self.catalog
    }

    /// Name of the detector, or `none`.
    #[must_use]
    pub fn detector_name(&self) -> &'static str {
        self.detector.as_ref().map_or("none", |d| d.name())
    }

    fn detect(&self, image: &image::DynamicImage) -> Vec<Detection> {
        let Some(detector) = self.detector.as_ref() else {
            return Vec::new();
        };
        match detector.detect(image) {
            Ok(detections) => {
                debug!(detector = detector.name(), count = detections.len(), "Detections");
                detections
            }
            Err(e) => {
                warn!("Detector '{}' failed, continuing without: {e:#}", detector.name());
                Vec::new()
            }
        }
    }

    /// Region of interest in analysis pixels from the best produce detection.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn roi(&self, detections: &[Detection], scale: f32, frame: (u32, u32)) -> Option<BoundingBox> {
        let best = detections
            .iter()
            .filter(|d| !d.is_defect())
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))?;
        let b = best.bbox.scaled(1.0 / scale);
        let pad_x = (b.width as f32 * self.config.roi_padding).round() as u32;
        let pad_y = (b.height as f32 * self.config.roi_padding).round() as u32;
        let x = b.x.saturating_sub(pad_x).min(frame.0);
        let y = b.y.saturating_sub(pad_y).min(frame.1);
        let right = (b.x + b.width + pad_x).min(frame.0);
        let bottom = (b.y + b.height + pad_y).min(frame.1);
        let roi = BoundingBox {
            x,
            y,
            width: right.saturating_sub(x),
            height: bottom.saturating_sub(y),
        };
        (roi.width >= MIN_ROI_SIDE && roi.height >= MIN_ROI_SIDE).then_some(roi)
    }

    /// Runs the full pipeline on one photo.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures outside the per-stage fallbacks
    /// (e.g. timestamp formatting). Detector and factor failures are logged
    /// and excluded from scoring.
    pub fn assess(&self, request: &GradingRequest) -> Result<QualityReport> {
        let started = Instant::now();
        let info = &request.image;

        let standard = request.product_type.as_deref().and_then(|t| {
            let found = self.catalog.get(t);
            if found.is_none() {
                warn!("No standard for product type '{t}', using generic scoring");
            }
            found
        });

        let frame_image = preprocess(&info.image, &self.config.preprocess);
        let detections = self.detect(&info.image);

        let mut defects: Vec<Defect> = detections
            .iter()
            .filter(|d| d.is_defect())
            .map(|d| Defect {
                kind: DefectKind::Detected,
                severity: DefectSeverity::from_confidence(d.confidence),
                source: DefectSource::Detector,
                details: DefectDetails::Detection {
                    label: d.label.clone(),
                    confidence: d.confidence,
                    bbox: d.bbox,
                },
            })
            .collect();

        let roi = self.roi(&detections, frame_image.scale, frame_image.rgb.dimensions());
        let frame = Sample::prepare(frame_image.rgb, self.config.min_contrast, standard);
        let cropped = roi.map(|r| {
            debug!(?r, "Analyzing detected region");
            Sample::prepare(crop(&frame.rgb, &r), self.config.min_contrast, standard)
                .within_frame(frame.frame_area())
        });
        let subject = cropped.as_ref().unwrap_or(&frame);

        let mut factors = FactorScores::default();
        let mut measurements = BTreeMap::new();
        for extractor in &self.factors {
            match extractor.assess(subject) {
                Ok(assessment) => {
                    factors.set(extractor.factor(), assessment.score);
                    for (key, value) in assessment.measurements {
                        measurements.insert(format!("{}.{key}", extractor.name()), value);
                    }
                    defects.extend(assessment.defects);
                }
                Err(e) => warn!("Factor '{}' failed on {}: {e:#}", extractor.name(), info.path),
            }
        }

        let capture = capture_metrics(&frame);
        let placement = composition(&frame);
        let (overall_score, score_breakdown) = self.policy.score(&factors, &defects, &capture);
        let grade = self.policy.grade(overall_score, defects.len());

        let recommendations = recommend(&RecommendationInput {
            capture: &capture,
            composition: &placement,
            color_accuracy: measurements.get("color.accuracy").copied(),
        });

        let timestamp = time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .context("Failed to format timestamp")?;
        let processing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            path = %info.path,
            score = overall_score,
            grade = %grade,
            defects = defects.len(),
            "Graded"
        );

        Ok(QualityReport {
            product_id: request.product_id.clone(),
            product_type: request.product_type.clone(),
            path: info.path.clone(),
            timestamp,
            dimensions: ImageDimensions::new(info.width, info.height),
            model_version: self.detector_name().to_string(),
            overall_score,
            grade,
            grade_label: grade.label().to_string(),
            factors,
            score_breakdown,
            defect_count: defects.len(),
            defect_severity: DefectSeverity::worst(&defects),
            defects,
            detections,
            capture,
            measurements,
            ripeness: ripeness(subject),
            estimated_weight: estimated_weight(
                subject.object_area(),
                factors.get(Factor::Shape).unwrap_or(0.5),
            ),
            recommendations,
            processing_time_ms,
            exif: None,
        })
    }
}
