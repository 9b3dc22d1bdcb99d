//! Domain entities: core data structures

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, DomainResult};

/// Nested sampling unit of the inventory design.
///
/// `S1`/`S2` are the adult-tree plots, `R1`..`R3` the regeneration sub-plots.
/// Variants are declared in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SamplingLevel {
    S1,
    S2,
    R1,
    R2,
    R3,
}

impl SamplingLevel {
    pub const ALL: [SamplingLevel; 5] = [
        SamplingLevel::S1,
        SamplingLevel::S2,
        SamplingLevel::R1,
        SamplingLevel::R2,
        SamplingLevel::R3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingLevel::S1 => "S1",
            SamplingLevel::S2 => "S2",
            SamplingLevel::R1 => "R1",
            SamplingLevel::R2 => "R2",
            SamplingLevel::R3 => "R3",
        }
    }

    /// Regeneration levels count individuals instead of one tree per row.
    pub fn is_regeneration(&self) -> bool {
        matches!(
            self,
            SamplingLevel::R1 | SamplingLevel::R2 | SamplingLevel::R3
        )
    }
}

impl fmt::Display for SamplingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SamplingLevel {
    type Err = DomainError;

    /// Case-insensitive, surrounding whitespace ignored (`" s2 "` → `S2`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "S1" => Ok(SamplingLevel::S1),
            "S2" => Ok(SamplingLevel::S2),
            "R1" => Ok(SamplingLevel::R1),
            "R2" => Ok(SamplingLevel::R2),
            "R3" => Ok(SamplingLevel::R3),
            _ => Err(DomainError::UnknownLevel(s.trim().to_string())),
        }
    }
}

/// Plot area (m²) of each sampling level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotAreas {
    pub s1: f64,
    pub s2: f64,
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
}

impl Default for PlotAreas {
    fn default() -> Self {
        Self {
            s2: 10.0 * 50.0,
            s1: 10.0 * 10.0,
            r3: 5.0 * 5.0,
            r2: 2.0 * 2.0,
            r1: 1.0,
        }
    }
}

impl PlotAreas {
    pub fn area(&self, level: SamplingLevel) -> f64 {
        match level {
            SamplingLevel::S1 => self.s1,
            SamplingLevel::S2 => self.s2,
            SamplingLevel::R1 => self.r1,
            SamplingLevel::R2 => self.r2,
            SamplingLevel::R3 => self.r3,
        }
    }

    /// Levels from the outermost (largest plot) to the innermost.
    pub fn nesting_order(&self) -> Vec<SamplingLevel> {
        let mut levels = SamplingLevel::ALL.to_vec();
        levels.sort_by(|a, b| self.area(*b).total_cmp(&self.area(*a)).then(a.cmp(b)));
        levels
    }
}

/// A single measured record from the field sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeMeasurement {
    /// 1-based data row in the source table (header excluded)
    pub row: usize,
    pub level: SamplingLevel,
    /// Plot identifier (`PF` column)
    pub plot: Option<String>,
    /// Circumference at breast height (cm)
    pub cap_cm: f64,
    /// Total height (m)
    pub total_height_m: Option<f64>,
    /// Commercial height (m)
    pub commercial_height_m: Option<f64>,
    /// Individual count on regeneration levels
    pub count: Option<f64>,
}

impl TreeMeasurement {
    /// Check the measurement can enter the computation.
    ///
    /// Rejects a non-positive CAP, any non-positive height and records
    /// without a usable height.
    pub fn validate(&self) -> DomainResult<()> {
        if !(self.cap_cm.is_finite() && self.cap_cm > 0.0) {
            return Err(DomainError::non_positive("CAP", self.cap_cm));
        }
        if let Some(h) = self.total_height_m {
            if !(h.is_finite() && h > 0.0) {
                return Err(DomainError::non_positive("HT", h));
            }
        }
        if let Some(h) = self.commercial_height_m {
            if !(h.is_finite() && h > 0.0) {
                return Err(DomainError::non_positive("HC", h));
            }
        }
        if self.total_height_m.is_none() && self.commercial_height_m.is_none() {
            return Err(DomainError::MissingValue("HT/HC"));
        }
        Ok(())
    }

    /// Number of individuals this record stands for.
    pub fn individuals(&self) -> f64 {
        self.count.unwrap_or(1.0)
    }

    /// Grouping key of the plot; records without `PF` form their own plot.
    pub fn plot_key(&self) -> String {
        plot_key(self.plot.as_deref(), self.row)
    }
}

fn plot_key(plot: Option<&str>, row: usize) -> String {
    match plot {
        Some(p) => p.to_string(),
        None => format!("#{row}"),
    }
}

/// Derived values of one accepted tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub row: usize,
    pub level: SamplingLevel,
    pub plot: Option<String>,
    pub cap_cm: f64,
    pub total_height_m: Option<f64>,
    pub commercial_height_m: Option<f64>,
    pub individuals: f64,
    pub dap_cm: f64,
    pub basal_area_m2: f64,
    pub volume_total_m3: Option<f64>,
    pub volume_commercial_m3: Option<f64>,
    /// Total-height volume, falling back to commercial-height volume
    pub volume_m3: Option<f64>,
    pub expansion_factor: Option<f64>,
    pub individuals_ha: Option<f64>,
    pub basal_area_ha: Option<f64>,
    pub volume_ha: Option<f64>,
    pub z_score: Option<f64>,
    pub dap_class: Option<String>,
    pub height_class: Option<String>,
}

impl MetricResult {
    pub fn plot_key(&self) -> String {
        plot_key(self.plot.as_deref(), self.row)
    }
}

/// Record rejected while reading or validating the input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordWarning {
    pub row: usize,
    pub level: Option<SamplingLevel>,
    pub reason: String,
}

impl fmt::Display for RecordWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Some(level) => write!(f, "row {} ({}): {}", self.row, level, self.reason),
            None => write!(f, "row {}: {}", self.row, self.reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurement(cap: f64, ht: Option<f64>, hc: Option<f64>) -> TreeMeasurement {
        TreeMeasurement {
            row: 1,
            level: SamplingLevel::S2,
            plot: None,
            cap_cm: cap,
            total_height_m: ht,
            commercial_height_m: hc,
            count: None,
        }
    }

    #[test]
    fn given_mixed_case_level_when_parsing_then_normalizes() {
        assert_eq!(" s2 ".parse::<SamplingLevel>().unwrap(), SamplingLevel::S2);
        assert_eq!("r1".parse::<SamplingLevel>().unwrap(), SamplingLevel::R1);
        assert!(matches!(
            "X9".parse::<SamplingLevel>(),
            Err(DomainError::UnknownLevel(_))
        ));
    }

    #[test]
    fn given_default_areas_when_ordering_then_outermost_first() {
        let order = PlotAreas::default().nesting_order();
        assert_eq!(
            order,
            vec![
                SamplingLevel::S2,
                SamplingLevel::S1,
                SamplingLevel::R3,
                SamplingLevel::R2,
                SamplingLevel::R1
            ]
        );
    }

    #[test]
    fn given_valid_measurement_when_validating_then_ok() {
        assert!(measurement(31.4, Some(12.0), None).validate().is_ok());
        assert!(measurement(31.4, None, Some(6.0)).validate().is_ok());
    }

    #[test]
    fn given_bad_measurement_when_validating_then_rejected() {
        assert!(measurement(0.0, Some(12.0), None).validate().is_err());
        assert!(measurement(f64::NAN, Some(12.0), None).validate().is_err());
        assert!(measurement(31.4, Some(-1.0), None).validate().is_err());
        assert_eq!(
            measurement(31.4, None, None).validate(),
            Err(DomainError::MissingValue("HT/HC"))
        );
    }

    #[test]
    fn given_record_without_plot_when_keying_then_uses_row() {
        let m = measurement(31.4, Some(12.0), None);
        assert_eq!(m.plot_key(), "#1");
        assert_eq!(m.individuals(), 1.0);
    }
}
