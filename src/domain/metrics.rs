//! Forestry formulas for a single tree or sample.
//!
//! All functions are pure. Preconditions are reported as [`DomainError`];
//! callers processing a batch turn those into absent values.

use std::f64::consts::PI;

use serde::Serialize;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::volume::VolumeEquation;

/// One hectare in m².
pub const HECTARE_M2: f64 = 10_000.0;

/// Diameter at breast height (cm) from circumference (cm).
pub fn compute_dap(cap: f64) -> DomainResult<f64> {
    if !(cap.is_finite() && cap > 0.0) {
        return Err(DomainError::non_positive("CAP", cap));
    }
    Ok(cap / PI)
}

/// Basal area (m²) from DAP (cm).
pub fn compute_basal_area(dap: f64) -> f64 {
    PI * (dap / 2.0).powi(2) / HECTARE_M2
}

/// DAP (cm) back from basal area (m²).
pub fn dap_from_basal_area(basal_area: f64) -> f64 {
    2.0 * (basal_area * HECTARE_M2 / PI).sqrt()
}

/// Volumes of one stem (m³).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct VolumeEstimate {
    pub total: Option<f64>,
    pub commercial: Option<f64>,
}

impl VolumeEstimate {
    /// Total-height volume when available, otherwise commercial.
    pub fn base(&self) -> Option<f64> {
        self.total.or(self.commercial)
    }
}

/// Stem volume from both heights using `equation`.
///
/// A height that is missing or not positive yields no volume for that height.
pub fn compute_volume(
    equation: &VolumeEquation,
    total_height: Option<f64>,
    commercial_height: Option<f64>,
    basal_area: f64,
) -> VolumeEstimate {
    let dap = dap_from_basal_area(basal_area);
    let at = |h: Option<f64>| {
        h.filter(|h| h.is_finite() && *h > 0.0)
            .and_then(|h| equation.volume(dap, basal_area, h))
    };
    VolumeEstimate {
        total: at(total_height),
        commercial: at(commercial_height),
    }
}

/// Standard score of `sample_mean` against `population_mean`.
pub fn compute_z_score(sample_mean: f64, population_mean: f64, std_dev: f64) -> DomainResult<f64> {
    if std_dev == 0.0 {
        return Err(DomainError::DivideByZero("standard deviation"));
    }
    Ok((sample_mean - population_mean) / std_dev)
}

/// Relative sampling error (%): `t · se / mean · 100`.
pub fn compute_sampling_error(std_error: f64, t_value: f64, mean: f64) -> DomainResult<f64> {
    if mean == 0.0 {
        return Err(DomainError::DivideByZero("mean"));
    }
    Ok(t_value * std_error / mean * 100.0)
}

/// Ratio of the represented area to the sampled area.
pub fn compute_expansion_factor(total_area: f64, sampled_area: f64) -> DomainResult<f64> {
    if sampled_area == 0.0 {
        return Err(DomainError::DivideByZero("sampled area"));
    }
    Ok(total_area / sampled_area)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_cap_31_4_when_computing_then_matches_reference_values() {
        let dap = compute_dap(31.4).unwrap();
        assert!((dap - 10.0).abs() < 0.01, "dap = {dap}");
        let g = compute_basal_area(dap);
        assert!((g - 0.00785).abs() < 1e-4, "g = {g}");
    }

    #[test]
    fn given_non_positive_cap_when_computing_dap_then_invalid_input() {
        assert!(matches!(
            compute_dap(0.0),
            Err(DomainError::InvalidInput { field: "CAP", .. })
        ));
        assert!(compute_dap(-3.0).is_err());
        assert!(compute_dap(f64::NAN).is_err());
    }

    #[test]
    fn given_basal_area_when_inverting_then_recovers_dap() {
        let g = compute_basal_area(23.5);
        assert!((dap_from_basal_area(g) - 23.5).abs() < 1e-9);
    }

    #[test]
    fn given_zero_std_dev_when_z_score_then_divide_by_zero() {
        assert_eq!(
            compute_z_score(1.0, 2.0, 0.0),
            Err(DomainError::DivideByZero("standard deviation"))
        );
        assert_eq!(compute_z_score(5.0, 3.0, 2.0), Ok(1.0));
    }

    #[test]
    fn given_sample_when_sampling_error_then_percent_of_mean() {
        let e = compute_sampling_error(2.0, 1.5, 30.0).unwrap();
        assert!((e - 10.0).abs() < 1e-12);
        assert!(compute_sampling_error(2.0, 1.5, 0.0).is_err());
    }

    #[test]
    fn given_one_plot_of_500m2_when_expanding_then_factor_20() {
        assert_eq!(compute_expansion_factor(HECTARE_M2, 500.0), Ok(20.0));
        assert!(compute_expansion_factor(HECTARE_M2, 0.0).is_err());
    }

    #[test]
    fn given_both_heights_when_volume_then_base_prefers_total() {
        let eq = VolumeEquation::default();
        let g = compute_basal_area(20.0);
        let v = compute_volume(&eq, Some(15.0), Some(8.0), g);
        assert!(v.total.unwrap() > v.commercial.unwrap());
        assert_eq!(v.base(), v.total);

        let only_hc = compute_volume(&eq, None, Some(8.0), g);
        assert_eq!(only_hc.base(), only_hc.commercial);
        assert!(compute_volume(&eq, Some(0.0), None, g).base().is_none());
    }
}
