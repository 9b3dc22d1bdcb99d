//! Export of processed inventories to CSV or JSON files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::application::services::ProcessedInventory;
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::SamplingLevel;
use crate::infrastructure::traits::FileSystem;

pub const TREES_FILE: &str = "processed_trees.csv";
pub const LEVELS_FILE: &str = "level_indicators.csv";
pub const SAMPLING_FILE: &str = "sampling_statistics.csv";
pub const JSON_FILE: &str = "inventory.json";

/// Output format of `process`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    /// One CSV file per table
    #[default]
    Csv,
    /// A single JSON document
    Json,
}

/// Row of `sampling_statistics.csv`.
#[derive(Debug, Serialize)]
struct SamplingRow {
    level: SamplingLevel,
    n: usize,
    mean: f64,
    variance: f64,
    std_dev: f64,
    cv_percent: Option<f64>,
    std_error: f64,
    t_value: f64,
    absolute_error: f64,
    relative_error_percent: Option<f64>,
    ci_lower: f64,
    ci_upper: f64,
    finite_correction: bool,
    required_units: Option<f64>,
    meets_allowed_error: bool,
}

fn serialize_err(context: &str, e: impl std::error::Error + Send + Sync + 'static) -> ApplicationError {
    ApplicationError::OperationFailed {
        context: context.to_string(),
        source: Box::new(e),
    }
}

fn to_csv<T: Serialize>(rows: impl IntoIterator<Item = T>) -> ApplicationResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| serialize_err("flush csv", e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| serialize_err("encode csv", e))
}

/// Per-tree table with all derived columns.
pub fn trees_csv(inventory: &ProcessedInventory) -> ApplicationResult<String> {
    to_csv(&inventory.trees)
}

/// Indicators of every level present.
pub fn levels_csv(inventory: &ProcessedInventory) -> ApplicationResult<String> {
    to_csv(inventory.levels.iter().map(|l| &l.indicators))
}

/// Sampling statistics of levels with at least two plots.
pub fn sampling_csv(inventory: &ProcessedInventory) -> ApplicationResult<String> {
    let allowed_error = inventory.parameters.allowed_error;
    to_csv(inventory.levels.iter().filter_map(|l| {
        l.sampling.map(|s| SamplingRow {
            level: l.level,
            n: s.n,
            mean: s.mean,
            variance: s.variance,
            std_dev: s.std_dev,
            cv_percent: s.cv_percent,
            std_error: s.std_error,
            t_value: s.t_value,
            absolute_error: s.absolute_error,
            relative_error_percent: s.relative_error_percent,
            ci_lower: s.ci_lower,
            ci_upper: s.ci_upper,
            finite_correction: s.finite_correction,
            required_units: s.required_units,
            meets_allowed_error: s.meets(allowed_error),
        })
    }))
}

/// Whole inventory as pretty-printed JSON.
pub fn inventory_json(inventory: &ProcessedInventory) -> ApplicationResult<String> {
    serde_json::to_string_pretty(inventory).map_err(|e| serialize_err("serialize inventory", e))
}

/// Writes processed inventories below an output directory.
pub struct ExportService {
    fs: Arc<dyn FileSystem>,
}

impl ExportService {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Write `inventory` in `format` to `output_dir`; returns the written paths.
    pub fn export(
        &self,
        inventory: &ProcessedInventory,
        format: ExportFormat,
        output_dir: &Path,
    ) -> ApplicationResult<Vec<PathBuf>> {
        debug!("export: format={:?}, dir={}", format, output_dir.display());
        self.fs
            .create_dir_all(output_dir)
            .with_path_context("create output directory", output_dir)?;

        let files = match format {
            ExportFormat::Csv => vec![
                (TREES_FILE, trees_csv(inventory)?),
                (LEVELS_FILE, levels_csv(inventory)?),
                (SAMPLING_FILE, sampling_csv(inventory)?),
            ],
            ExportFormat::Json => vec![(JSON_FILE, inventory_json(inventory)?)],
        };

        let mut written = Vec::with_capacity(files.len());
        for (name, content) in files {
            let path = output_dir.join(name);
            self.write(&path, &content)?;
            written.push(path);
        }
        info!("exported {} file(s) to {}", written.len(), output_dir.display());
        Ok(written)
    }

    /// Write `content` to `path`, creating parent directories.
    pub fn write(&self, path: &Path, content: &str) -> ApplicationResult<()> {
        self.fs
            .ensure_parent(path)
            .with_path_context("create parent directory", path)?;
        self.fs
            .write(path, content)
            .with_path_context("write file", path)
    }
}
