//! Mergeable sums and volume moments.
//!
//! Plots fold tree results, levels fold plots and the inventory folds levels.
//! [`Aggregate::merge`] combines moments with Chan's parallel update, so the
//! grouping does not change the result beyond float rounding.

use serde::Serialize;

use crate::domain::entities::{MetricResult, SamplingLevel};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Aggregate {
    pub records: usize,
    pub individuals: f64,
    pub basal_area_m2: f64,
    pub volume_m3: f64,
    /// Trees that contributed a volume
    pub volume_count: usize,
    #[serde(skip)]
    pub(crate) volume_mean: f64,
    #[serde(skip)]
    pub(crate) volume_m2: f64,
}

impl Aggregate {
    pub fn from_result(result: &MetricResult) -> Self {
        let mut agg = Self {
            records: 1,
            individuals: result.individuals,
            basal_area_m2: result.basal_area_m2,
            ..Self::default()
        };
        if let Some(v) = result.volume_m3 {
            agg.volume_m3 = v;
            agg.volume_count = 1;
            agg.volume_mean = v;
        }
        agg
    }

    pub fn merge(&self, other: &Self) -> Self {
        let n_a = self.volume_count as f64;
        let n_b = other.volume_count as f64;
        let n = n_a + n_b;
        let (mean, m2) = if n == 0.0 {
            (0.0, 0.0)
        } else {
            let delta = other.volume_mean - self.volume_mean;
            (
                self.volume_mean + delta * n_b / n,
                self.volume_m2 + other.volume_m2 + delta * delta * n_a * n_b / n,
            )
        };
        Self {
            records: self.records + other.records,
            individuals: self.individuals + other.individuals,
            basal_area_m2: self.basal_area_m2 + other.basal_area_m2,
            volume_m3: self.volume_m3 + other.volume_m3,
            volume_count: self.volume_count + other.volume_count,
            volume_mean: mean,
            volume_m2: m2,
        }
    }

    pub fn fold<'a>(items: impl IntoIterator<Item = &'a Aggregate>) -> Self {
        items
            .into_iter()
            .fold(Self::default(), |acc, item| acc.merge(item))
    }

    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a MetricResult>) -> Self {
        results
            .into_iter()
            .fold(Self::default(), |acc, r| acc.merge(&Self::from_result(r)))
    }

    pub fn volume_mean(&self) -> Option<f64> {
        (self.volume_count > 0).then_some(self.volume_mean)
    }

    /// Sample variance of tree volumes.
    pub fn volume_variance(&self) -> Option<f64> {
        (self.volume_count > 1).then(|| self.volume_m2 / (self.volume_count as f64 - 1.0))
    }

    pub fn volume_std_dev(&self) -> Option<f64> {
        self.volume_variance().map(f64::sqrt)
    }
}

/// Aggregate of one plot (`PF`) within a level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotAggregate {
    pub level: SamplingLevel,
    pub plot: String,
    pub aggregate: Aggregate,
}

/// Aggregate of one level, built from its plots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelAggregate {
    pub level: SamplingLevel,
    pub plots: Vec<PlotAggregate>,
    pub aggregate: Aggregate,
}

impl LevelAggregate {
    pub fn from_plots(level: SamplingLevel, plots: Vec<PlotAggregate>) -> Self {
        let aggregate = Aggregate::fold(plots.iter().map(|p| &p.aggregate));
        Self {
            level,
            plots,
            aggregate,
        }
    }
}
