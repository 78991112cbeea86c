use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Mean and sample standard deviation of one historical series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    pub mean: f64,
    /// Unbiased (n - 1) estimator.
    pub std_dev: f64,
}

impl StatSummary {
    /// Summarise a series. Returns `None` for fewer than two samples, where
    /// the sample standard deviation is undefined.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.len() < 2 {
            return None;
        }
        let mean = samples.iter().mean();
        // Variance is taken over deviations from the mean so that a constant
        // series yields exactly zero spread.
        let std_dev = samples.iter().map(|x| x - mean).std_dev();
        if !mean.is_finite() || !std_dev.is_finite() {
            return None;
        }
        Some(StatSummary { mean, std_dev })
    }

    /// A summary with no spread: every draw returns `mean`.
    #[cfg(test)]
    pub fn fixed(mean: f64) -> Self {
        StatSummary { mean, std_dev: 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_and_unbiased_std_dev() {
        let s = StatSummary::from_samples(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_relative_eq!(s.mean, 5.0, epsilon = 1e-12);
        // Sum of squared deviations is 32, divided by n - 1 = 7.
        assert_relative_eq!(s.std_dev, (32.0f64 / 7.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn two_samples_is_enough() {
        let s = StatSummary::from_samples(&[1.0, 3.0]).unwrap();
        assert_relative_eq!(s.mean, 2.0, epsilon = 1e-12);
        assert_relative_eq!(s.std_dev, 2.0f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn constant_series_has_exactly_zero_spread() {
        for n in 2..40 {
            let samples = vec![0.9; n];
            let s = StatSummary::from_samples(&samples).unwrap();
            assert_eq!(s.std_dev, 0.0, "n={n}");
            assert_eq!(s.mean, 0.9, "n={n}");
        }
    }

    #[test]
    fn fewer_than_two_samples_is_undefined() {
        assert!(StatSummary::from_samples(&[]).is_none());
        assert!(StatSummary::from_samples(&[101.5]).is_none());
    }

    #[test]
    fn non_finite_input_is_rejected() {
        assert!(StatSummary::from_samples(&[1.0, f64::NAN, 2.0]).is_none());
        assert!(StatSummary::from_samples(&[1.0, f64::INFINITY]).is_none());
    }
}
