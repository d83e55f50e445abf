//! Weighted multi-factor scoring and grade assignment.

use crate::domain::{
    CaptureMetrics, Defect, DefectSeverity, Factor, FactorScores, Grade, GradeThresholds,
    ScoreBreakdown,
};

/// Relative importance of each factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorWeights {
    /// Weight of the size factor.
    pub size: f32,
    /// Weight of the colour factor.
    pub color: f32,
    /// Weight of the shape factor.
    pub shape: f32,
    /// Weight of the surface factor.
    pub surface: f32,
    /// Weight of the freshness factor.
    pub freshness: f32,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            size: 0.20,
            color: 0.25,
            shape: 0.20,
            surface: 0.25,
            freshness: 0.10,
        }
    }
}

impl FactorWeights {
    /// Weight of `factor`.
    #[must_use]
    pub const fn get(&self, factor: Factor) -> f32 {
        match factor {
            Factor::Size => self.size,
            Factor::Color => self.color,
            Factor::Shape => self.shape,
            Factor::Surface => self.surface,
            Factor::Freshness => self.freshness,
        }
    }

    /// Checks that weights are finite, non-negative and not all zero.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid weight.
    pub fn validate(&self) -> Result<(), String> {
        for factor in Factor::ALL {
            let w = self.get(factor);
            if !w.is_finite() || w < 0.0 {
                return Err(format!("weights.{factor} must be a non-negative number, got {w}"));
            }
        }
        if Factor::ALL.iter().map(|f| self.get(*f)).sum::<f32>() <= 0.0 {
            return Err("at least one factor weight must be positive".to_string());
        }
        Ok(())
    }
}

/// Defect counts above which a grade is unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefectTolerance {
    /// More defects than this rules out grade A.
    pub max_defects_a: usize,
    /// More defects than this rules out grade B.
    pub max_defects_b: usize,
    /// More defects than this forces grade D.
    pub max_defects_c: usize,
}

impl Default for DefectTolerance {
    fn default() -> Self {
        Self {
            max_defects_a: 0,
            max_defects_b: 2,
            max_defects_c: 5,
        }
    }
}

impl DefectTolerance {
    /// Best grade allowed with `count` defects.
    #[must_use]
    pub const fn best_allowed(&self, count: usize) -> Grade {
        if count > self.max_defects_c {
            Grade::D
        } else if count > self.max_defects_b {
            Grade::C
        } else if count > self.max_defects_a {
            Grade::B
        } else {
            Grade::A
        }
    }
}

/// Points deducted per defect, by severity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityPenalty {
    /// Per low-severity defect.
    pub low: f32,
    /// Per medium-severity defect.
    pub medium: f32,
    /// Per high-severity defect.
    pub high: f32,
}

impl Default for SeverityPenalty {
    fn default() -> Self {
        Self {
            low: 2.5,
            medium: 5.0,
            high: 10.0,
        }
    }
}

impl SeverityPenalty {
    /// Points for one defect of `severity`.
    #[must_use]
    pub const fn points(&self, severity: DefectSeverity) -> f32 {
        match severity {
            DefectSeverity::None => 0.0,
            DefectSeverity::Low => self.low,
            DefectSeverity::Medium => self.medium,
            DefectSeverity::High => self.high,
        }
    }
}

/// Everything that turns factor scores into a grade.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringPolicy {
    /// Factor weights.
    pub weights: FactorWeights,
    /// Score thresholds per grade.
    pub thresholds: GradeThresholds,
    /// Defect count caps.
    pub tolerance: DefectTolerance,
    /// Defect penalties.
    pub penalties: SeverityPenalty,
}

/// Noise level above which the capture penalty applies.
const NOISE_LIMIT: f32 = 20.0;
/// Points per unit of noise above the limit.
const NOISE_PENALTY_RATE: f32 = 0.5;

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

impl ScoringPolicy {
    /// Checks weights, thresholds and tolerances.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        self.weights.validate()?;
        self.thresholds.validate()?;
        let t = &self.tolerance;
        if !(t.max_defects_a <= t.max_defects_b && t.max_defects_b <= t.max_defects_c) {
            return Err(format!(
                "defect tolerances must be non-decreasing (A <= B <= C), got {} / {} / {}",
                t.max_defects_a, t.max_defects_b, t.max_defects_c
            ));
        }
        for (name, p) in [
            ("low", self.penalties.low),
            ("medium", self.penalties.medium),
            ("high", self.penalties.high),
        ] {
            if !p.is_finite() || p < 0.0 {
                return Err(format!("penalty for {name} defects must be >= 0, got {p}"));
            }
        }
        Ok(())
    }

    /// Weighted mean of the available factor scores, in `[0, 1]`.
    ///
    /// Weights are renormalized over the factors that produced a score.
    /// Returns 0 when none did.
    #[must_use]
    pub fn weighted(&self, factors: &FactorScores) -> f32 {
        let (sum, weight) = Factor::ALL
            .iter()
            .filter_map(|f| factors.get(*f).map(|s| (s, self.weights.get(*f))))
            .fold((0.0, 0.0), |(sum, weight), (s, w)| (sum + s * w, weight + w));
        if weight <= 0.0 {
            0.0
        } else {
            (sum / weight).clamp(0.0, 1.0)
        }
    }

    /// Overall score (0-100, two decimals) and its breakdown.
    #[must_use]
    pub fn score(
        &self,
        factors: &FactorScores,
        defects: &[Defect],
        capture: &CaptureMetrics,
    ) -> (f32, ScoreBreakdown) {
        let weighted = self.weighted(factors) * 100.0;
        let defect_penalty: f32 = defects
            .iter()
            .map(|d| self.penalties.points(d.severity))
            .sum();
        let capture_penalty = if capture.noise_level > NOISE_LIMIT {
            (capture.noise_level - NOISE_LIMIT) * NOISE_PENALTY_RATE
        } else {
            0.0
        };
        let overall = round2((weighted - defect_penalty - capture_penalty).clamp(0.0, 100.0));
        (
            overall,
            ScoreBreakdown {
                weighted: round2(weighted),
                defect_penalty: round2(defect_penalty),
                capture_penalty: round2(capture_penalty),
            },
        )
    }

    /// Grade from the score, capped by the defect count.
    #[must_use]
    pub fn grade(&self, score: f32, defect_count: usize) -> Grade {
        self.thresholds
            .grade_for(score)
            .max(self.tolerance.best_allowed(defect_count))
    }
}
