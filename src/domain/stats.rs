//! Simple random sampling statistics over plot units.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::{Data, Distribution};

use crate::domain::metrics::compute_sampling_error;

/// Share of the population above which the finite population correction applies.
const FINITE_POPULATION_THRESHOLD: f64 = 0.05;

/// Parameters of the sampling design.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingDesign {
    /// Two-sided confidence level, e.g. `0.90`
    pub confidence: f64,
    /// Target relative error (%)
    pub allowed_error: f64,
    /// Number of possible plots in the property, when the area is known
    pub population_units: Option<f64>,
}

/// Two-sided Student's t quantile for `confidence` with `df` degrees of freedom.
pub fn student_t(confidence: f64, df: f64) -> Option<f64> {
    if !(confidence > 0.0 && confidence < 1.0) || !(df > 0.0) {
        return None;
    }
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some(dist.inverse_cdf(1.0 - (1.0 - confidence) / 2.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingStatistics {
    pub n: usize,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub cv_percent: Option<f64>,
    pub std_error: f64,
    pub t_value: f64,
    pub absolute_error: f64,
    pub relative_error_percent: Option<f64>,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub finite_correction: bool,
    pub required_units: Option<f64>,
}

impl SamplingStatistics {
    /// Statistics of per-unit values; `None` below two units.
    pub fn compute(values: &[f64], design: &SamplingDesign) -> Option<Self> {
        let n = values.len();
        if n < 2 {
            return None;
        }
        let data = Data::new(values.to_vec());
        let mean = data.mean()?;
        let variance = data.variance()?;
        let std_dev = variance.sqrt();

        let population = design.population_units.filter(|big_n| *big_n > 0.0);
        let fraction = population.map(|big_n| n as f64 / big_n).unwrap_or(0.0);
        let finite_correction = fraction > FINITE_POPULATION_THRESHOLD;
        let correction = if finite_correction {
            (1.0 - fraction).max(0.0)
        } else {
            1.0
        };
        let std_error = (variance / n as f64 * correction).sqrt();

        let t_value = student_t(design.confidence, n as f64 - 1.0)?;
        let absolute_error = t_value * std_error;
        let relative_error_percent = compute_sampling_error(std_error, t_value, mean).ok();
        let cv_percent = (mean != 0.0).then(|| std_dev / mean * 100.0);

        let required_units = cv_percent.and_then(|cv| {
            let e2 = design.allowed_error.powi(2);
            let t2cv2 = t_value.powi(2) * cv.powi(2);
            let denom = match population {
                Some(big_n) if finite_correction => e2 + t2cv2 / big_n,
                _ => e2,
            };
            (denom > 0.0).then(|| (t2cv2 / denom).ceil())
        });

        Some(Self {
            n,
            mean,
            variance,
            std_dev,
            cv_percent,
            std_error,
            t_value,
            absolute_error,
            relative_error_percent,
            ci_lower: mean - absolute_error,
            ci_upper: mean + absolute_error,
            finite_correction,
            required_units,
        })
    }

    /// Whether the achieved relative error is within `allowed_error` (%).
    pub fn meets(&self, allowed_error: f64) -> bool {
        self.relative_error_percent
            .map(|e| e.abs() <= allowed_error)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn design(population_units: Option<f64>) -> SamplingDesign {
        SamplingDesign {
            confidence: 0.95,
            allowed_error: 10.0,
            population_units,
        }
    }

    #[test]
    fn given_large_df_when_t_then_close_to_normal_quantile() {
        let t = student_t(0.95, 10_000.0).unwrap();
        assert!((t - 1.96).abs() < 0.01, "t = {t}");
        let t4 = student_t(0.95, 4.0).unwrap();
        assert!((t4 - 2.776).abs() < 0.001, "t4 = {t4}");
        assert!(student_t(1.5, 4.0).is_none());
    }

    #[test]
    fn given_five_plots_when_infinite_population_then_textbook_values() {
        let values = [10.0, 12.0, 14.0, 16.0, 18.0];
        let s = SamplingStatistics::compute(&values, &design(None)).unwrap();
        assert_eq!(s.n, 5);
        assert!((s.mean - 14.0).abs() < 1e-12);
        assert!((s.variance - 10.0).abs() < 1e-12);
        assert!((s.std_error - 2.0f64.sqrt()).abs() < 1e-12);
        assert!(!s.finite_correction);
        let expected = s.t_value * s.std_error / 14.0 * 100.0;
        assert!((s.relative_error_percent.unwrap() - expected).abs() < 1e-9);
        assert!(s.ci_lower < s.mean && s.mean < s.ci_upper);
        assert!(s.required_units.unwrap() >= 1.0);
    }

    #[test]
    fn given_large_sampling_fraction_when_computing_then_finite_correction_shrinks_error() {
        let values = [10.0, 12.0, 14.0, 16.0, 18.0];
        let infinite = SamplingStatistics::compute(&values, &design(None)).unwrap();
        let finite = SamplingStatistics::compute(&values, &design(Some(20.0))).unwrap();
        assert!(finite.finite_correction);
        assert!(finite.std_error < infinite.std_error);
    }

    #[test]
    fn given_single_plot_when_computing_then_none() {
        assert!(SamplingStatistics::compute(&[3.0], &design(None)).is_none());
    }

    #[test]
    fn given_zero_mean_when_computing_then_relative_values_absent() {
        let s = SamplingStatistics::compute(&[-1.0, 1.0], &design(None)).unwrap();
        assert_eq!(s.relative_error_percent, None);
        assert_eq!(s.cv_percent, None);
        assert_eq!(s.required_units, None);
        assert!(!s.meets(10.0));
    }
}
