//! Quality grades and the score thresholds that define them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Discrete quality bucket derived from the overall score.
///
/// Ordering follows quality: `A < B` means A is the better grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    /// Premium.
    A,
    /// Good.
    B,
    /// Fair.
    C,
    /// Poor.
    D,
}

impl Grade {
    /// All grades from best to worst.
    pub const ALL: [Self; 4] = [Self::A, Self::B, Self::C, Self::D];

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::A => "Premium",
            Self::B => "Good",
            Self::C => "Fair",
            Self::D => "Poor",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        };
        f.write_str(letter)
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            other => Err(format!("'{other}' is not a grade (expected A, B, C or D)")),
        }
    }
}

/// Minimum overall score (0-100) for each grade above D.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeThresholds {
    /// Minimum score for grade A.
    pub a: f32,
    /// Minimum score for grade B.
    pub b: f32,
    /// Minimum score for grade C.
    pub c: f32,
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            a: 85.0,
            b: 70.0,
            c: 50.0,
        }
    }
}

impl GradeThresholds {
    /// Checks `100 >= a > b > c >= 0`.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated bound.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.a) {
            return Err(format!("grade A threshold must be 0-100, got {}", self.a));
        }
        if self.c < 0.0 {
            return Err(format!("grade C threshold must be >= 0, got {}", self.c));
        }
        if !(self.a > self.b && self.b > self.c) {
            return Err(format!(
                "grade thresholds must be strictly decreasing (A > B > C), got {} / {} / {}",
                self.a, self.b, self.c
            ));
        }
        Ok(())
    }

    /// Maps a score to a grade. Boundary scores belong to the higher grade.
    #[must_use]
    pub fn grade_for(&self, score: f32) -> Grade {
        if score >= self.a {
            Grade::A
        } else if score >= self.b {
            Grade::B
        } else if score >= self.c {
            Grade::C
        } else {
            Grade::D
        }
    }
}
