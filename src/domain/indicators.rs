//! Per-hectare and whole-property indicators of a sampling level.

use serde::{Deserialize, Serialize};

use crate::domain::aggregate::Aggregate;
use crate::domain::entities::SamplingLevel;
use crate::domain::metrics::{compute_expansion_factor, HECTARE_M2};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelIndicators {
    pub level: SamplingLevel,
    pub plots: usize,
    pub plot_area_m2: f64,
    /// Hectare over sampled area (ha⁻¹)
    pub expansion_factor: Option<f64>,
    pub individuals: f64,
    pub basal_area_m2: f64,
    pub volume_m3: f64,
    pub individuals_ha: Option<f64>,
    pub basal_area_ha: Option<f64>,
    pub volume_ha: Option<f64>,
    pub individuals_total: Option<f64>,
    pub basal_area_total: Option<f64>,
    pub volume_total: Option<f64>,
}

/// Expansion factor of a level with `plots` plots of `plot_area` m².
pub fn level_expansion_factor(plot_area: f64, plots: usize) -> Option<f64> {
    compute_expansion_factor(HECTARE_M2, plot_area * plots as f64).ok()
}

impl LevelIndicators {
    /// Indicators from the sampled sums; totals only when `area_ha > 0`.
    pub fn compute(
        level: SamplingLevel,
        aggregate: &Aggregate,
        plots: usize,
        plot_area: f64,
        area_ha: f64,
    ) -> Self {
        let expansion_factor = level_expansion_factor(plot_area, plots);
        let per_ha = |sampled: f64| expansion_factor.map(|fe| sampled * fe);
        let over_area = |per_ha: Option<f64>| per_ha.filter(|_| area_ha > 0.0).map(|v| v * area_ha);

        let individuals_ha = per_ha(aggregate.individuals);
        let basal_area_ha = per_ha(aggregate.basal_area_m2);
        let volume_ha = per_ha(aggregate.volume_m3);

        Self {
            level,
            plots,
            plot_area_m2: plot_area,
            expansion_factor,
            individuals: aggregate.individuals,
            basal_area_m2: aggregate.basal_area_m2,
            volume_m3: aggregate.volume_m3,
            individuals_ha,
            basal_area_ha,
            volume_ha,
            individuals_total: over_area(individuals_ha),
            basal_area_total: over_area(basal_area_ha),
            volume_total: over_area(volume_ha),
        }
    }
}
