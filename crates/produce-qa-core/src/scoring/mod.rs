//! Turning factor scores and defects into a grade, and reports into advice.

mod insights;
mod policy;
mod recommendations;

pub use insights::{CommonDefect, GradeDistribution, InsightsSummary, QualityInsights, QualityTrend};
pub use policy::{DefectTolerance, FactorWeights, ScoringPolicy, SeverityPenalty};
pub use recommendations::{recommend, RecommendationInput};
