//! Stem volume equations.

use serde::{Deserialize, Serialize};

/// Volume equation used for every tree of an inventory.
///
/// Selected in configuration as a tagged table:
///
/// ```toml
/// [volume]
/// model = "form_factor"
/// factor = 0.7
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum VolumeEquation {
    /// `V = a · D^b · H^c`, D in metres.
    SchumacherHall { a: f64, b: f64, c: f64 },
    /// `V = g · H · f`.
    FormFactor { factor: f64 },
    /// `V = a + b · D² · H`, D in metres.
    Spurr { a: f64, b: f64 },
}

impl Default for VolumeEquation {
    fn default() -> Self {
        VolumeEquation::SchumacherHall {
            a: 1.3332,
            b: 2.0836,
            c: 0.732,
        }
    }
}

impl VolumeEquation {
    /// Volume (m³) of a stem with `dap` (cm), basal area `g` (m²) and `height` (m).
    ///
    /// Returns `None` when the equation yields a non-finite or negative value.
    pub fn volume(&self, dap: f64, g: f64, height: f64) -> Option<f64> {
        let d = dap / 100.0;
        let v = match *self {
            VolumeEquation::SchumacherHall { a, b, c } => a * d.powf(b) * height.powf(c),
            VolumeEquation::FormFactor { factor } => g * height * factor,
            VolumeEquation::Spurr { a, b } => a + b * d * d * height,
        };
        (v.is_finite() && v >= 0.0).then_some(v)
    }

    pub fn name(&self) -> &'static str {
        match self {
            VolumeEquation::SchumacherHall { .. } => "schumacher_hall",
            VolumeEquation::FormFactor { .. } => "form_factor",
            VolumeEquation::Spurr { .. } => "spurr",
        }
    }

    /// Human readable formula with the configured coefficients.
    pub fn describe(&self) -> String {
        match *self {
            VolumeEquation::SchumacherHall { a, b, c } => {
                format!("V = {a} × (DAP/100)^{b} × H^{c}")
            }
            VolumeEquation::FormFactor { factor } => format!("V = g × H × {factor}"),
            VolumeEquation::Spurr { a, b } => format!("V = {a} + {b} × (DAP/100)² × H"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn given_default_equation_when_dap_30_height_20_then_local_equation_value() {
        let eq = VolumeEquation::default();
        let g = PI * (30.0f64 / 200.0).powi(2);
        let expected = 1.3332 * 0.3f64.powf(2.0836) * 20.0f64.powf(0.732);
        let v = eq.volume(30.0, g, 20.0).unwrap();
        assert!((v - expected).abs() < 1e-12);
    }

    #[test]
    fn given_form_factor_when_volume_then_cylinder_times_factor() {
        let eq = VolumeEquation::FormFactor { factor: 0.5 };
        assert_eq!(eq.volume(0.0, 0.1, 10.0), Some(0.5));
    }

    #[test]
    fn given_spurr_with_negative_intercept_when_tiny_tree_then_none() {
        let eq = VolumeEquation::Spurr { a: -1.0, b: 0.4 };
        assert_eq!(eq.volume(1.0, 0.0, 1.0), None);
    }

    #[test]
    fn given_toml_table_when_deserializing_then_selects_model() {
        let eq: VolumeEquation = toml::from_str("model = \"spurr\"\na = 0.01\nb = 0.42\n").unwrap();
        assert_eq!(eq, VolumeEquation::Spurr { a: 0.01, b: 0.42 });
        assert_eq!(eq.name(), "spurr");
    }
}
