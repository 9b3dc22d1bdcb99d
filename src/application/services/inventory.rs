//! Inventory processing service
//!
//! Runs the whole pipeline over a field sheet: per-tree metrics, expansion
//! factors, Z-scores, diameter/height classes, plot → level → inventory
//! aggregation and sampling statistics.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use itertools::Itertools;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::application::table::InventoryTable;
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::{SamplingVariable, Settings};
use crate::domain::{
    compute_basal_area, compute_dap, compute_volume, compute_z_score, level_expansion_factor,
    Aggregate, ClassFrequency, ClassIntervals, DomainResult, LevelAggregate, LevelIndicators,
    MetricResult, PlotAggregate, RecordWarning, SamplingDesign, SamplingLevel,
    SamplingStatistics, TreeMeasurement, VolumeEquation, HECTARE_M2,
};
use crate::infrastructure::traits::FileSystem;

/// Lower bound of the first DAP class (cm).
pub const DAP_CLASS_MINIMUM: f64 = 10.0;
/// Lower bound of the first height class (m).
pub const HEIGHT_CLASS_MINIMUM: f64 = 1.5;
/// Level whose trees define the diameter and height classes.
pub const CLASS_LEVEL: SamplingLevel = SamplingLevel::S2;

/// Parameters the inventory was processed with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryParameters {
    pub area_ha: f64,
    pub confidence: f64,
    pub allowed_error: f64,
    pub sampling_variable: SamplingVariable,
    pub volume: VolumeEquation,
}

/// Everything computed for one sampling level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSummary {
    pub level: SamplingLevel,
    pub aggregate: LevelAggregate,
    pub indicators: LevelIndicators,
    pub sampling: Option<SamplingStatistics>,
}

/// Result of processing a field sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedInventory {
    pub parameters: InventoryParameters,
    /// Data rows read (accepted + rejected)
    pub rows: usize,
    pub trees: Vec<MetricResult>,
    pub warnings: Vec<RecordWarning>,
    /// One entry per level present, in level order
    pub levels: Vec<LevelSummary>,
    pub total: Aggregate,
    pub dap_classes: Option<ClassIntervals>,
    pub height_classes: Option<ClassIntervals>,
    /// DAP frequency of the class level
    pub dap_distribution: Vec<ClassFrequency>,
}

impl ProcessedInventory {
    pub fn level(&self, level: SamplingLevel) -> Option<&LevelSummary> {
        self.levels.iter().find(|l| l.level == level)
    }
}

/// Plot value of `variable` scaled to one hectare.
pub fn plot_value(variable: SamplingVariable, aggregate: &Aggregate, plot_area: f64) -> f64 {
    let sampled = match variable {
        SamplingVariable::Volume => aggregate.volume_m3,
        SamplingVariable::BasalArea => aggregate.basal_area_m2,
        SamplingVariable::Individuals => aggregate.individuals,
    };
    sampled * HECTARE_M2 / plot_area
}

/// Service computing forestry metrics for a field sheet.
pub struct InventoryService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl InventoryService {
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Read and parse a CSV field sheet.
    pub fn load(&self, input: &Path) -> ApplicationResult<InventoryTable> {
        debug!("load: input={}", input.display());
        let content = self
            .fs
            .read_to_string(input)
            .with_path_context("read field sheet", input)?;
        InventoryTable::parse(&content, &self.settings.regeneration_count_columns)
    }

    /// Load and process a field sheet.
    ///
    /// # Errors
    /// Unreadable input, missing required columns, or no acceptable record.
    pub fn process_file(&self, input: &Path) -> ApplicationResult<ProcessedInventory> {
        let table = self.load(input)?;
        if table.records.is_empty() {
            return Err(ApplicationError::NoRecords {
                rejected: table.warnings.len(),
            });
        }
        Ok(self.process(&table))
    }

    /// Metrics of a single measurement, before level-wide values are known.
    pub fn tree_metrics(&self, m: &TreeMeasurement) -> DomainResult<MetricResult> {
        let dap = compute_dap(m.cap_cm)?;
        let g = compute_basal_area(dap);
        let volume = compute_volume(
            &self.settings.volume,
            m.total_height_m,
            m.commercial_height_m,
            g,
        );
        Ok(MetricResult {
            row: m.row,
            level: m.level,
            plot: m.plot.clone(),
            cap_cm: m.cap_cm,
            total_height_m: m.total_height_m,
            commercial_height_m: m.commercial_height_m,
            individuals: m.individuals(),
            dap_cm: dap,
            basal_area_m2: g,
            volume_total_m3: volume.total,
            volume_commercial_m3: volume.commercial,
            volume_m3: volume.base(),
            expansion_factor: None,
            individuals_ha: None,
            basal_area_ha: None,
            volume_ha: None,
            z_score: None,
            dap_class: None,
            height_class: None,
        })
    }

    /// Process parsed records. Source records are not modified.
    #[instrument(skip_all, fields(records = table.records.len()))]
    pub fn process(&self, table: &InventoryTable) -> ProcessedInventory {
        let mut warnings = table.warnings.clone();
        let mut trees = Vec::with_capacity(table.records.len());
        for m in &table.records {
            match self.tree_metrics(m) {
                Ok(result) => trees.push(result),
                Err(e) => {
                    warn!("rejected row {}: {}", m.row, e);
                    warnings.push(RecordWarning {
                        row: m.row,
                        level: Some(m.level),
                        reason: e.to_string(),
                    });
                }
            }
        }
        warnings.sort_by_key(|w| w.row);

        self.apply_expansion_factors(&mut trees);
        apply_z_scores(&mut trees);
        let (dap_classes, height_classes) = build_classes(&trees, table.has_total_height);
        for t in trees.iter_mut() {
            t.dap_class = dap_classes.as_ref().and_then(|c| c.label_of(t.dap_cm));
            let height = class_height(t, table.has_total_height);
            t.height_class = height_classes
                .as_ref()
                .zip(height)
                .and_then(|(c, h)| c.label_of(h));
        }
        let dap_distribution = dap_classes
            .as_ref()
            .map(|c| c.frequencies(&class_level_daps(&trees)))
            .unwrap_or_default();

        let levels = self.summarize_levels(&trees);
        let total = Aggregate::fold(levels.iter().map(|l| &l.aggregate.aggregate));
        info!(
            "processed {} trees in {} levels ({} rejected)",
            trees.len(),
            levels.len(),
            warnings.len()
        );

        ProcessedInventory {
            parameters: InventoryParameters {
                area_ha: self.settings.area_ha,
                confidence: self.settings.confidence,
                allowed_error: self.settings.allowed_error,
                sampling_variable: self.settings.sampling_variable,
                volume: self.settings.volume,
            },
            rows: table.rows,
            trees,
            warnings,
            levels,
            total,
            dap_classes,
            height_classes,
            dap_distribution,
        }
    }

    fn apply_expansion_factors(&self, trees: &mut [MetricResult]) {
        let factors: BTreeMap<SamplingLevel, Option<f64>> = trees
            .iter()
            .into_group_map_by(|t| t.level)
            .into_iter()
            .map(|(level, members)| {
                let plots = members.iter().map(|t| t.plot_key()).unique().count();
                let factor = level_expansion_factor(self.settings.plot_areas.area(level), plots);
                debug!("level {}: {} plots, factor {:?}", level, plots, factor);
                (level, factor)
            })
            .collect();

        for t in trees.iter_mut() {
            let factor = factors.get(&t.level).copied().flatten();
            t.expansion_factor = factor;
            t.individuals_ha = factor.map(|f| t.individuals * f);
            t.basal_area_ha = factor.map(|f| t.basal_area_m2 * f);
            t.volume_ha = factor.zip(t.volume_m3).map(|(f, v)| v * f);
        }
    }

    fn summarize_levels(&self, trees: &[MetricResult]) -> Vec<LevelSummary> {
        let groups: Vec<(SamplingLevel, Vec<&MetricResult>)> = trees
            .iter()
            .into_group_map_by(|t| t.level)
            .into_iter()
            .sorted_by_key(|(level, _)| *level)
            .collect();

        let summarize = |(level, members): &(SamplingLevel, Vec<&MetricResult>)| {
            self.summarize_level(*level, members)
        };
        if self.settings.parallel {
            debug!("summarize_levels: {} levels on rayon pool", groups.len());
            groups.par_iter().map(summarize).collect()
        } else {
            groups.iter().map(summarize).collect()
        }
    }

    fn summarize_level(&self, level: SamplingLevel, members: &[&MetricResult]) -> LevelSummary {
        let settings = &self.settings;
        let plot_area = settings.plot_areas.area(level);

        let mut by_plot: BTreeMap<String, Vec<&MetricResult>> = BTreeMap::new();
        for t in members {
            by_plot.entry(t.plot_key()).or_default().push(*t);
        }
        let plots: Vec<PlotAggregate> = by_plot
            .into_iter()
            .map(|(plot, trees)| PlotAggregate {
                level,
                plot,
                aggregate: Aggregate::from_results(trees.iter().copied()),
            })
            .collect();
        let aggregate = LevelAggregate::from_plots(level, plots);

        let indicators = LevelIndicators::compute(
            level,
            &aggregate.aggregate,
            aggregate.plots.len(),
            plot_area,
            settings.area_ha,
        );

        let values: Vec<f64> = aggregate
            .plots
            .iter()
            .map(|p| plot_value(settings.sampling_variable, &p.aggregate, plot_area))
            .collect();
        let design = SamplingDesign {
            confidence: settings.confidence,
            allowed_error: settings.allowed_error,
            population_units: (settings.area_ha > 0.0)
                .then(|| settings.area_ha * HECTARE_M2 / plot_area),
        };
        let sampling = SamplingStatistics::compute(&values, &design);
        if sampling.is_none() {
            debug!("level {}: fewer than two plots, no sampling statistics", level);
        }

        LevelSummary {
            level,
            aggregate,
            indicators,
            sampling,
        }
    }
}

/// Z-score of each tree volume against the mean of all tree volumes.
fn apply_z_scores(trees: &mut [MetricResult]) {
    let overall = Aggregate::from_results(trees.iter());
    let (Some(mean), Some(std_dev)) = (overall.volume_mean(), overall.volume_std_dev()) else {
        debug!("z-score: fewer than two volumes");
        return;
    };
    for t in trees.iter_mut() {
        t.z_score = t
            .volume_m3
            .and_then(|v| compute_z_score(v, mean, std_dev).ok());
    }
}

fn class_level_daps(trees: &[MetricResult]) -> Vec<f64> {
    trees
        .iter()
        .filter(|t| t.level == CLASS_LEVEL)
        .map(|t| t.dap_cm)
        .collect()
}

/// Height used for classes: total height when the sheet has an `HT` column.
fn class_height(tree: &MetricResult, has_total_height: bool) -> Option<f64> {
    if has_total_height {
        tree.total_height_m
    } else {
        tree.commercial_height_m
    }
}

fn build_classes(
    trees: &[MetricResult],
    has_total_height: bool,
) -> (Option<ClassIntervals>, Option<ClassIntervals>) {
    let daps = class_level_daps(trees);
    let heights: Vec<f64> = trees
        .iter()
        .filter(|t| t.level == CLASS_LEVEL)
        .filter_map(|t| class_height(t, has_total_height))
        .collect();
    (
        ClassIntervals::sturges(&daps, DAP_CLASS_MINIMUM),
        ClassIntervals::sturges(&heights, HEIGHT_CLASS_MINIMUM),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::traits::MemoryFileSystem;

    fn service(settings: Settings) -> InventoryService {
        InventoryService::new(Arc::new(MemoryFileSystem::new()), Arc::new(settings))
    }

    fn table(csv: &str) -> InventoryTable {
        InventoryTable::parse(csv, &Settings::default().regeneration_count_columns).unwrap()
    }

    #[test]
    fn given_reference_tree_when_processing_then_dap_and_basal_area_match() {
        let processed = service(Settings::default()).process(&table("Nivel,CAP,HT\nS2,31.4,10\n"));
        let tree = &processed.trees[0];
        assert!((tree.dap_cm - 10.0).abs() < 0.01);
        assert!((tree.basal_area_m2 - 0.00785).abs() < 1e-4);
        assert_eq!(tree.expansion_factor, Some(20.0));
        assert_eq!(tree.z_score, None);
    }

    #[test]
    fn given_equal_volumes_when_processing_then_z_score_absent() {
        let processed =
            service(Settings::default()).process(&table("Nivel,CAP,HT\nS2,40,10\nS2,40,10\n"));
        assert!(processed.trees.iter().all(|t| t.z_score.is_none()));
    }

    #[test]
    fn given_two_plots_when_processing_then_level_has_sampling_statistics() {
        let csv = "Nivel,PF,CAP,HT\nS2,1,60,15\nS2,1,45,12\nS2,2,80,18\nS2,3,50,14\n";
        let processed = service(Settings::default()).process(&table(csv));
        let s2 = processed.level(SamplingLevel::S2).unwrap();
        assert_eq!(s2.indicators.plots, 3);
        assert!((s2.indicators.expansion_factor.unwrap() - 10_000.0 / 1_500.0).abs() < 1e-12);
        let stats = s2.sampling.unwrap();
        assert_eq!(stats.n, 3);
        assert!(stats.relative_error_percent.is_some());
    }

    #[test]
    fn given_parallel_setting_when_processing_then_same_result_as_sequential() {
        let csv = "Nivel,PF,CAP,HT,Qtde\nS2,1,60,15,\nS1,1,30,9,\nR1,1,3,1,5\nR2,2,4,1.5,2\nS2,2,70,16,\n";
        let sequential = service(Settings::default()).process(&table(csv));
        let parallel = service(Settings {
            parallel: true,
            ..Settings::default()
        })
        .process(&table(csv));
        assert_eq!(sequential.levels, parallel.levels);
        let order: Vec<SamplingLevel> = sequential.levels.iter().map(|l| l.level).collect();
        assert_eq!(
            order,
            vec![
                SamplingLevel::S1,
                SamplingLevel::S2,
                SamplingLevel::R1,
                SamplingLevel::R2
            ]
        );
    }

    #[test]
    fn given_sampling_variable_when_plot_value_then_scales_to_hectare() {
        let agg = Aggregate {
            records: 2,
            individuals: 2.0,
            basal_area_m2: 0.1,
            volume_m3: 1.0,
            ..Aggregate::default()
        };
        assert_eq!(plot_value(SamplingVariable::Volume, &agg, 500.0), 20.0);
        assert_eq!(plot_value(SamplingVariable::BasalArea, &agg, 500.0), 2.0);
        assert_eq!(plot_value(SamplingVariable::Individuals, &agg, 500.0), 40.0);
    }
}
