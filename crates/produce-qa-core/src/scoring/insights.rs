//! Batch statistics over many reports.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{DefectKind, Grade, QualityReport};

/// Score change (points) that counts as a trend between first and last image.
const TREND_DEAD_BAND: f32 = 1.0;

/// Aggregate view of a batch of reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityInsights {
    /// Score statistics.
    pub summary: InsightsSummary,
    /// Number of reports per grade.
    pub grade_distribution: GradeDistribution,
    /// The most frequent grade; ties go to the worse grade.
    pub most_common_grade: Grade,
    /// Defect types with occurrence counts, most frequent first.
    pub common_defects: Vec<CommonDefect>,
    /// Direction of scores from the first report to the last.
    pub quality_trend: QualityTrend,
    /// Batch-level advice.
    pub recommendations: Vec<String>,
}

/// Score statistics of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsightsSummary {
    /// Number of reports.
    pub total_images: usize,
    /// Mean overall score.
    pub average_score: f32,
    /// Population standard deviation of overall scores.
    pub score_std: f32,
    /// Lowest overall score.
    pub min_score: f32,
    /// Highest overall score.
    pub max_score: f32,
}

/// Reports per grade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeDistribution {
    /// Grade A count.
    #[serde(rename = "A")]
    pub a: usize,
    /// Grade B count.
    #[serde(rename = "B")]
    pub b: usize,
    /// Grade C count.
    #[serde(rename = "C")]
    pub c: usize,
    /// Grade D count.
    #[serde(rename = "D")]
    pub d: usize,
}

impl GradeDistribution {
    /// Count for `grade`.
    #[must_use]
    pub const fn get(&self, grade: Grade) -> usize {
        match grade {
            Grade::A => self.a,
            Grade::B => self.b,
            Grade::C => self.c,
            Grade::D => self.d,
        }
    }

    fn increment(&mut self, grade: Grade) {
        match grade {
            Grade::A => self.a += 1,
            Grade::B => self.b += 1,
            Grade::C => self.c += 1,
            Grade::D => self.d += 1,
        }
    }

    /// The grade with the highest count; ties go to the worse grade.
    #[must_use]
    pub fn most_common(&self) -> Grade {
        Grade::ALL
            .into_iter()
            .fold(Grade::A, |best, g| if self.get(g) >= self.get(best) { g } else { best })
    }
}

/// One defect type and how often it occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonDefect {
    /// Defect type.
    #[serde(rename = "type")]
    pub kind: DefectKind,
    /// Number of occurrences across the batch.
    pub count: usize,
}

/// Direction of quality across a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTrend {
    /// Last score more than a point above the first.
    Improving,
    /// Within a point.
    Stable,
    /// Last score more than a point below the first.
    Declining,
}

fn round2(value: f64) -> f32 {
    #[allow(clippy::cast_possible_truncation)]
    let rounded = ((value * 100.0).round() / 100.0) as f32;
    rounded
}

impl QualityInsights {
    /// Summarizes a batch, in submission order. `None` for an empty batch.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_reports(reports: &[QualityReport]) -> Option<Self> {
        let first = reports.first()?;
        let last = reports.last()?;

        let scores: Vec<f64> = reports.iter().map(|r| f64::from(r.overall_score)).collect();
        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut grades = GradeDistribution::default();
        let mut defect_counts: BTreeMap<DefectKind, usize> = BTreeMap::new();
        let mut with_dark_spots = 0usize;
        for report in reports {
            grades.increment(report.grade);
            for defect in &report.defects {
                *defect_counts.entry(defect.kind).or_default() += 1;
            }
            if report.defects.iter().any(|d| d.kind == DefectKind::DarkSpots) {
                with_dark_spots += 1;
            }
        }
        let mut common_defects: Vec<CommonDefect> = defect_counts
            .into_iter()
            .map(|(kind, count)| CommonDefect { kind, count })
            .collect();
        common_defects.sort_by(|a, b| b.count.cmp(&a.count).then(a.kind.cmp(&b.kind)));

        let delta = last.overall_score - first.overall_score;
        let quality_trend = if delta > TREND_DEAD_BAND {
            QualityTrend::Improving
        } else if delta < -TREND_DEAD_BAND {
            QualityTrend::Declining
        } else {
            QualityTrend::Stable
        };

        let mut recommendations = Vec::new();
        if mean < 70.0 {
            recommendations.push("Overall quality needs improvement".to_string());
            recommendations.push("Focus on better photography techniques".to_string());
        }
        if with_dark_spots as f64 > 0.3 * n {
            recommendations.push("Address product freshness and handling".to_string());
        }

        Some(Self {
            summary: InsightsSummary {
                total_images: reports.len(),
                average_score: round2(mean),
                score_std: round2(variance.sqrt()),
                min_score: round2(min),
                max_score: round2(max),
            },
            most_common_grade: grades.most_common(),
            grade_distribution: grades,
            common_defects,
            quality_trend,
            recommendations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CaptureMetrics, Defect, DefectDetails, DefectSeverity, FactorScores, ImageDimensions,
        Ripeness, ScoreBreakdown,
    };

    fn report(score: f32, grade: Grade, defects: Vec<DefectKind>) -> QualityReport {
        let defects: Vec<Defect> = defects
            .into_iter()
            .map(|kind| {
                let details = DefectDetails::Coverage { fraction: 0.1 };
                Defect::heuristic(kind, DefectSeverity::Medium, details)
            })
            .collect();
        QualityReport {
            product_id: "p".into(),
            product_type: None,
            path: "p.jpg".into(),
            timestamp: "2026-01-01T00:00:00Z".into(),
            dimensions: ImageDimensions::new(10, 10),
            model_version: "heuristic".into(),
            overall_score: score,
            grade,
            grade_label: grade.label().into(),
            factors: FactorScores::default(),
            score_breakdown: ScoreBreakdown::default(),
            defect_count: defects.len(),
            defect_severity: DefectSeverity::worst(&defects),
            defects,
            detections: vec![],
            capture: CaptureMetrics::default(),
            measurements: BTreeMap::new(),
            ripeness: Ripeness::Unknown,
            estimated_weight: None,
            recommendations: vec![],
            processing_time_ms: 1,
            exif: None,
        }
    }

    #[test]
    fn test_empty_batch() {
        assert!(QualityInsights::from_reports(&[]).is_none());
    }

    #[test]
    fn test_summary_statistics() {
        let reports = [
            report(60.0, Grade::C, vec![DefectKind::DarkSpots]),
            report(80.0, Grade::B, vec![]),
            report(90.0, Grade::A, vec![]),
        ];
        let insights = QualityInsights::from_reports(&reports).unwrap();
        let s = insights.summary;
        assert_eq!(s.total_images, 3);
        assert!((s.average_score - 76.67).abs() < 1e-3);
        assert!((s.score_std - 12.47).abs() < 1e-3);
        assert!((s.min_score - 60.0).abs() < f32::EPSILON);
        assert!((s.max_score - 90.0).abs() < f32::EPSILON);
        assert_eq!(insights.quality_trend, QualityTrend::Improving);
        // One of three images with dark spots is above 30 %.
        assert_eq!(insights.recommendations, vec!["Address product freshness and handling"]);
    }

    #[test]
    fn test_trend_dead_band() {
        let stable = [report(70.0, Grade::B, vec![]), report(70.8, Grade::B, vec![])];
        let declining = [report(70.0, Grade::B, vec![]), report(60.0, Grade::C, vec![])];
        let trend = |r: &[QualityReport]| QualityInsights::from_reports(r).unwrap().quality_trend;
        assert_eq!(trend(&stable), QualityTrend::Stable);
        assert_eq!(trend(&declining), QualityTrend::Declining);
        assert_eq!(trend(&stable[..1]), QualityTrend::Stable);
    }

    #[test]
    fn test_grade_distribution_and_ties() {
        let reports = [
            report(90.0, Grade::A, vec![]),
            report(40.0, Grade::D, vec![DefectKind::Browning, DefectKind::DarkSpots]),
            report(45.0, Grade::D, vec![DefectKind::Browning]),
            report(88.0, Grade::A, vec![]),
        ];
        let insights = QualityInsights::from_reports(&reports).unwrap();
        assert_eq!(insights.grade_distribution.a, 2);
        assert_eq!(insights.grade_distribution.d, 2);
        assert_eq!(insights.most_common_grade, Grade::D);
        let expected = vec![
            CommonDefect {
                kind: DefectKind::Browning,
                count: 2,
            },
            CommonDefect {
                kind: DefectKind::DarkSpots,
                count: 1,
            },
        ];
        assert_eq!(insights.common_defects, expected);
        assert!(insights
            .recommendations
            .iter()
            .any(|r| r == "Overall quality needs improvement"));
    }

    #[test]
    fn test_serialized_shape() {
        let insights =
            QualityInsights::from_reports(&[report(90.0, Grade::A, vec![])]).unwrap();
        let json = serde_json::to_value(&insights).unwrap();
        assert_eq!(json["grade_distribution"]["A"], 1);
        assert_eq!(json["most_common_grade"], "A");
        assert_eq!(json["quality_trend"], "stable");
    }
}
