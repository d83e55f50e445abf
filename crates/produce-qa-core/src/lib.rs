//! Produce QA Core - Domain logic and grading pipeline
//!
//! This crate contains the domain types, image analysis primitives, the five
//! quality factor extractors, object/defect detectors, and the weighted
//! scoring policy that turns a produce photo into a [`QualityReport`].

pub mod analysis;
pub mod assessor;
pub mod domain;
pub mod factors;
pub mod imaging;
pub mod inference;
pub mod ports;
pub mod scoring;

pub use assessor::{AssessorConfig, QualityAssessor};
pub use domain::{
    Defect, DefectKind, DefectSeverity, Detection, Detector, Factor, Grade, GradingRequest,
    ImageInfo, ProductStandard, QualityReport, StandardsCatalog,
};
pub use ports::{ImageSource, ProgressEvent, ProgressSink, ReportOutput};
pub use scoring::{QualityInsights, ScoringPolicy};
