//! 256-bin histogram over 8-bit values.

/// 256-bin histogram of 8-bit values (luma, distances, saturation, ...).
#[derive(Debug, Clone)]
pub struct Histogram {
    bins: [u64; 256],
    total: u64,
}

impl Histogram {
    /// Builds a histogram from any sequence of values.
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = u8>) -> Self {
        let mut bins = [0u64; 256];
        for v in values {
            bins[usize::from(v)] += 1;
        }
        let total = bins.iter().sum();
        Self { bins, total }
    }

    /// Histogram of a grayscale image.
    #[must_use]
    pub fn from_luma(image: &image::GrayImage) -> Self {
        Self::from_values(image.pixels().map(|p| p.0[0]))
    }

    /// Returns the total sample count.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Number of bins with at least one sample.
    #[must_use]
    pub fn nonzero_bins(&self) -> usize {
        self.bins.iter().filter(|&&c| c > 0).count()
    }

    /// Mean value.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let sum: u64 = self
            .bins
            .iter()
            .enumerate()
            .map(|(i, &count)| (i as u64) * count)
            .sum();
        sum as f64 / self.total as f64
    }

    /// Population standard deviation.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .bins
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                let diff = i as f64 - mean;
                diff * diff * count as f64
            })
            .sum::<f64>()
            / self.total as f64;
        variance.sqrt()
    }

    /// Count of samples `<= threshold`.
    #[must_use]
    pub fn count_below(&self, threshold: u8) -> u64 {
        self.bins[..=usize::from(threshold)].iter().sum()
    }

    /// Count of samples `>= threshold`.
    #[must_use]
    pub fn count_above(&self, threshold: u8) -> u64 {
        self.bins[usize::from(threshold)..].iter().sum()
    }

    /// Fraction of samples `<= threshold`.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn fraction_below(&self, threshold: u8) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count_below(threshold) as f64 / self.total as f64
    }

    /// Fraction of samples `>= threshold`.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn fraction_above(&self, threshold: u8) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count_above(threshold) as f64 / self.total as f64
    }

    /// Otsu's threshold: the value maximizing between-class variance.
    ///
    /// Samples `> threshold` form the upper class. Returns 0 for an empty or
    /// single-valued histogram.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    #[must_use]
    pub fn otsu_threshold(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let total = self.total as f64;
        let sum_all: f64 = self
            .bins
            .iter()
            .enumerate()
            .map(|(i, &c)| i as f64 * c as f64)
            .sum();

        let mut best = 0usize;
        let mut best_var = 0.0f64;
        let mut weight_lo = 0.0f64;
        let mut sum_lo = 0.0f64;
        for (t, &count) in self.bins.iter().enumerate() {
            weight_lo += count as f64;
            if weight_lo == 0.0 {
                continue;
            }
            let weight_hi = total - weight_lo;
            if weight_hi == 0.0 {
                break;
            }
            sum_lo += t as f64 * count as f64;
            let mean_lo = sum_lo / weight_lo;
            let mean_hi = (sum_all - sum_lo) / weight_hi;
            let between = weight_lo * weight_hi * (mean_lo - mean_hi).powi(2);
            if between > best_var {
                best_var = between;
                best = t;
            }
        }
        best as u8
    }
}
