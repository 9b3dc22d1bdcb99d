//! Properties of the per-tree formulas.

use std::f64::consts::PI;

use rstest::rstest;

use florytica::domain::{
    compute_basal_area, compute_dap, compute_expansion_factor, compute_sampling_error,
    compute_volume, compute_z_score, level_expansion_factor, student_t, DomainError,
    VolumeEquation,
};

#[rstest]
#[case(31.4)]
#[case(1.0)]
#[case(157.08)]
#[case(0.5)]
fn given_positive_cap_when_computing_dap_then_cap_over_pi(#[case] cap: f64) {
    assert!((compute_dap(cap).unwrap() - cap / PI).abs() < 1e-12);
}

#[rstest]
#[case(0.0)]
#[case(-3.0)]
#[case(f64::NAN)]
fn given_non_positive_cap_when_computing_dap_then_invalid_input(#[case] cap: f64) {
    assert!(matches!(
        compute_dap(cap),
        Err(DomainError::InvalidInput { field: "CAP", .. })
    ));
}

#[test]
fn given_increasing_dap_when_computing_basal_area_then_increasing() {
    let areas: Vec<f64> = (1..200).map(|d| compute_basal_area(d as f64 * 0.5)).collect();
    assert!(areas.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn given_cap_31_4_when_computing_then_reference_values() {
    let dap = compute_dap(31.4).unwrap();
    assert!((dap - 10.0).abs() < 0.01);
    let g = compute_basal_area(dap);
    assert!((g - PI * 25.0 / 10_000.0).abs() < 1e-5);
    assert!((g - 0.00785).abs() < 1e-4);
}

#[rstest]
#[case(0.0, 1.0)]
#[case(12.5, 3.2)]
#[case(-4.0, 0.01)]
fn given_equal_means_when_computing_z_score_then_zero(#[case] mean: f64, #[case] std: f64) {
    assert_eq!(compute_z_score(mean, mean, std).unwrap(), 0.0);
}

#[test]
fn given_zero_std_when_computing_z_score_then_divide_by_zero() {
    assert!(matches!(
        compute_z_score(1.0, 2.0, 0.0),
        Err(DomainError::DivideByZero(_))
    ));
}

#[rstest]
#[case(2.0, 1.7, 20.0, 17.0)]
#[case(0.5, 2.0, 10.0, 10.0)]
fn given_values_when_computing_sampling_error_then_percent(
    #[case] se: f64,
    #[case] t: f64,
    #[case] mean: f64,
    #[case] expected: f64,
) {
    assert!((compute_sampling_error(se, t, mean).unwrap() - expected).abs() < 1e-12);
}

#[test]
fn given_zero_mean_when_computing_sampling_error_then_divide_by_zero() {
    assert!(matches!(
        compute_sampling_error(1.0, 2.0, 0.0),
        Err(DomainError::DivideByZero(_))
    ));
}

#[rstest]
#[case(500.0, 2, 10.0)]
#[case(100.0, 1, 100.0)]
#[case(1.0, 4, 2_500.0)]
fn given_plots_when_computing_level_factor_then_hectare_over_sampled(
    #[case] plot_area: f64,
    #[case] plots: usize,
    #[case] expected: f64,
) {
    assert_eq!(level_expansion_factor(plot_area, plots), Some(expected));
    assert_eq!(
        compute_expansion_factor(10_000.0, plot_area * plots as f64).unwrap(),
        expected
    );
}

#[test]
fn given_no_sampled_area_when_computing_expansion_factor_then_divide_by_zero() {
    assert!(compute_expansion_factor(10_000.0, 0.0).is_err());
    assert_eq!(level_expansion_factor(500.0, 0), None);
}

#[test]
fn given_total_and_commercial_heights_when_computing_volume_then_base_prefers_total() {
    let g = compute_basal_area(30.0);
    let eq = VolumeEquation::default();
    let v = compute_volume(&eq, Some(20.0), Some(12.0), g);
    assert!(v.total.unwrap() > v.commercial.unwrap());
    assert_eq!(v.base(), v.total);

    let only_commercial = compute_volume(&eq, None, Some(12.0), g);
    assert_eq!(only_commercial.base(), only_commercial.commercial);

    let none = compute_volume(&eq, Some(0.0), None, g);
    assert_eq!(none.base(), None);
}

#[test]
fn given_form_factor_when_computing_volume_then_cylinder_times_factor() {
    let g = compute_basal_area(40.0);
    let v = compute_volume(&VolumeEquation::FormFactor { factor: 0.5 }, Some(10.0), None, g);
    assert!((v.total.unwrap() - g * 10.0 * 0.5).abs() < 1e-12);
}

#[rstest]
#[case(0.95, 10.0, 2.228)]
#[case(0.90, 4.0, 2.132)]
fn given_confidence_when_looking_up_student_t_then_table_value(
    #[case] confidence: f64,
    #[case] df: f64,
    #[case] expected: f64,
) {
    assert!((student_t(confidence, df).unwrap() - expected).abs() < 1e-3);
}
