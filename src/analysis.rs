//! Statistical summary of a sample sequence.
//!
//! The runner only needs an [`Analyzer`]; [`SummaryAnalyzer`] is the default
//! and computes plain descriptive statistics with IQR outlier counts.

use crate::benchmark::Sample;
use crate::config::Configuration;
use crate::environment::Environment;
use serde::{Deserialize, Serialize};

/// Analysis of the samples of one benchmark and parameter set.
///
/// All values are nanoseconds per iteration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SampleAnalysis {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub low_outliers: usize,
    pub high_outliers: usize,
    pub sample_count: usize,
}

impl SampleAnalysis {
    /// Share of samples flagged as outliers, in percent.
    pub fn outlier_percentage(&self) -> f64 {
        if self.sample_count == 0 {
            return 0.0;
        }
        (self.low_outliers + self.high_outliers) as f64 / self.sample_count as f64 * 100.0
    }
}

/// Turns samples into an analysis result.
pub trait Analyzer {
    fn analyse(
        &self,
        cfg: &Configuration,
        env: &Environment,
        samples: &[Sample],
    ) -> SampleAnalysis;
}

/// Descriptive statistics with Tukey fences at `k × IQR`.
#[derive(Debug, Clone)]
pub struct SummaryAnalyzer {
    k: f64,
}

impl SummaryAnalyzer {
    pub fn new() -> Self {
        Self { k: 1.5 }
    }

    /// Width of the outlier fences in interquartile ranges.
    pub fn fence(mut self, k: f64) -> Self {
        self.k = k;
        self
    }
}

impl Default for SummaryAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for SummaryAnalyzer {
    fn analyse(
        &self,
        _cfg: &Configuration,
        _env: &Environment,
        samples: &[Sample],
    ) -> SampleAnalysis {
        if samples.is_empty() {
            return SampleAnalysis::default();
        }

        let mut sorted: Vec<f64> = samples.iter().map(|s| s.as_nanos()).collect();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();

        let mean = sorted.iter().sum::<f64>() / n as f64;
        let std_dev = if n < 2 {
            0.0
        } else {
            let variance = sorted
                .iter()
                .map(|x| {
                    let diff = x - mean;
                    diff * diff
                })
                .sum::<f64>()
                / (n - 1) as f64;
            variance.sqrt()
        };

        let q1 = percentile(&sorted, 25.0);
        let q3 = percentile(&sorted, 75.0);
        let iqr = q3 - q1;
        let low_fence = q1 - self.k * iqr;
        let high_fence = q3 + self.k * iqr;

        SampleAnalysis {
            mean,
            median: percentile(&sorted, 50.0),
            std_dev,
            min: sorted[0],
            max: sorted[n - 1],
            low_outliers: sorted.iter().filter(|x| **x < low_fence).count(),
            high_outliers: sorted.iter().filter(|x| **x > high_fence).count(),
            sample_count: n,
        }
    }
}

/// Linear-interpolated percentile of sorted data.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Estimate;
    use std::time::Duration;

    fn env() -> Environment {
        let estimate = Estimate {
            mean: Duration::from_nanos(20),
            samples: 1,
        };
        Environment {
            clock_resolution: estimate,
            clock_cost: estimate,
        }
    }

    fn samples(values: &[f64]) -> Vec<Sample> {
        values.iter().copied().map(Sample::from_nanos).collect()
    }

    #[test]
    fn should_summarize_samples() {
        let result = SummaryAnalyzer::new().analyse(
            &Configuration::new(),
            &env(),
            &samples(&[4.0, 2.0, 3.0, 1.0, 5.0]),
        );
        assert_eq!(result.mean, 3.0);
        assert_eq!(result.median, 3.0);
        assert_eq!(result.min, 1.0);
        assert_eq!(result.max, 5.0);
        assert_eq!(result.sample_count, 5);
        assert!((result.std_dev - 2.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn should_count_outliers_outside_fences() {
        let result = SummaryAnalyzer::new().analyse(
            &Configuration::new(),
            &env(),
            &samples(&[10.0, 11.0, 10.0, 12.0, 11.0, 10.0, 100.0]),
        );
        assert_eq!(result.high_outliers, 1);
        assert_eq!(result.low_outliers, 0);
        assert!(result.outlier_percentage() > 14.0);
    }

    #[test]
    fn should_return_default_when_no_samples() {
        let result = SummaryAnalyzer::new().analyse(&Configuration::new(), &env(), &[]);
        assert_eq!(result, SampleAnalysis::default());
        assert_eq!(result.outlier_percentage(), 0.0);
    }

    #[test]
    fn should_interpolate_percentiles() {
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 50.0), 2.5);
        assert_eq!(percentile(&[7.0], 99.0), 7.0);
    }
}
