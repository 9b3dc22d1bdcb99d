//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/florytica/florytica.toml`
//! 3. Local config: `<project_dir>/.florytica.toml`
//! 4. Environment variables: `FLORYTICA_*` prefix
//! 5. Command line flags (applied by the CLI layer)

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{PlotAreas, VolumeEquation};

/// Plot variable used for the sampling statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SamplingVariable {
    /// Volume per hectare (m³/ha)
    #[default]
    Volume,
    /// Basal area per hectare (m²/ha)
    BasalArea,
    /// Individuals per hectare
    Individuals,
}

impl SamplingVariable {
    pub fn label(&self) -> &'static str {
        match self {
            SamplingVariable::Volume => "m³/ha",
            SamplingVariable::BasalArea => "m²/ha",
            SamplingVariable::Individuals => "ind/ha",
        }
    }
}

/// Raw plot areas for intermediate parsing (`None` → inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawPlotAreas {
    pub s1: Option<f64>,
    pub s2: Option<f64>,
    pub r1: Option<f64>,
    pub r2: Option<f64>,
    pub r3: Option<f64>,
}

impl RawPlotAreas {
    fn apply(&self, base: &PlotAreas) -> PlotAreas {
        PlotAreas {
            s1: self.s1.unwrap_or(base.s1),
            s2: self.s2.unwrap_or(base.s2),
            r1: self.r1.unwrap_or(base.r1),
            r2: self.r2.unwrap_or(base.r2),
            r3: self.r3.unwrap_or(base.r3),
        }
    }
}

/// Raw settings for intermediate parsing.
///
/// Used during layered config merging to distinguish between:
/// - `None` → field not specified, inherit from base
/// - `Some([])` → explicit empty array
/// - `Some([...])` → explicit values to merge
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub area_ha: Option<f64>,
    pub confidence: Option<f64>,
    pub allowed_error: Option<f64>,
    pub sampling_variable: Option<SamplingVariable>,
    pub parallel: Option<bool>,
    pub output_dir: Option<PathBuf>,
    pub volume: Option<VolumeEquation>,
    pub plot_areas: RawPlotAreas,
    pub regeneration_count_columns: Option<Vec<String>>,
}

/// Unified configuration for florytica.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Total property area (ha); `0` means unknown
    pub area_ha: f64,
    /// Confidence level of the sampling error (0..1)
    pub confidence: f64,
    /// Allowed relative sampling error (%)
    pub allowed_error: f64,
    /// Plot variable for sampling statistics
    pub sampling_variable: SamplingVariable,
    /// Process levels on the rayon pool
    pub parallel: bool,
    /// Where exports are written
    pub output_dir: PathBuf,
    /// Candidate names of the regeneration count column, first match wins
    pub regeneration_count_columns: Vec<String>,
    /// Stem volume equation
    pub volume: VolumeEquation,
    /// Plot area (m²) per sampling level
    pub plot_areas: PlotAreas,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            area_ha: 0.0,
            confidence: 0.90,
            allowed_error: 10.0,
            sampling_variable: SamplingVariable::default(),
            parallel: false,
            output_dir: PathBuf::from("."),
            regeneration_count_columns: vec![
                "Nº de Ind.".into(),
                "Num_Ind".into(),
                "Qtde".into(),
                "Quantidade".into(),
            ],
            volume: VolumeEquation::default(),
            plot_areas: PlotAreas::default(),
        }
    }
}

/// Get the XDG config directory for florytica.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "florytica").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("florytica.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn project_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".florytica.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand `~`, `$VAR` and `${VAR}` in a path string.
pub fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

impl Settings {
    /// Merge arrays keeping base order, with negation support.
    ///
    /// - Items from overlay are appended to base
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["a", "b"], &["c"])       // → ["a", "b", "c"]
    /// merge_array(&["a", "b"], &["!a", "c"]) // → ["b", "c"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: Vec<String> = Vec::with_capacity(base.len() + overlay.len());
        for item in base {
            if !result.contains(item) {
                result.push(item.clone());
            }
        }
        for pattern in overlay {
            if let Some(negated) = pattern.strip_prefix('!') {
                result.retain(|item| item != negated);
            } else if !result.contains(pattern) {
                result.push(pattern.clone());
            }
        }
        result
    }

    /// Check value ranges after all layers are applied.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        let invalid = |message: String| -> Result<(), ApplicationError> {
            Err(ApplicationError::Config { message })
        };
        if !(self.area_ha.is_finite() && self.area_ha >= 0.0) {
            return invalid(format!("area_ha must be >= 0, got {}", self.area_ha));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return invalid(format!(
                "confidence must be between 0 and 1, got {}",
                self.confidence
            ));
        }
        if !(self.allowed_error > 0.0) {
            return invalid(format!(
                "allowed_error must be > 0, got {}",
                self.allowed_error
            ));
        }
        for level in crate::domain::SamplingLevel::ALL {
            let area = self.plot_areas.area(level);
            if !(area.is_finite() && area > 0.0) {
                return invalid(format!("plot area of {level} must be > 0, got {area}"));
            }
        }
        Ok(())
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_path(self.output_dir.to_string_lossy().as_ref());
        self.output_dir = PathBuf::from(expanded);
    }

    /// Scalars: overlay wins if Some. Arrays: union (`union_arrays`) or replace.
    fn overlay(&self, raw: &RawSettings, union_arrays: bool) -> Self {
        let columns = match &raw.regeneration_count_columns {
            Some(o) if union_arrays => Self::merge_array(&self.regeneration_count_columns, o),
            Some(o) => o.clone(),
            None => self.regeneration_count_columns.clone(),
        };
        Self {
            area_ha: raw.area_ha.unwrap_or(self.area_ha),
            confidence: raw.confidence.unwrap_or(self.confidence),
            allowed_error: raw.allowed_error.unwrap_or(self.allowed_error),
            sampling_variable: raw.sampling_variable.unwrap_or(self.sampling_variable),
            parallel: raw.parallel.unwrap_or(self.parallel),
            output_dir: raw
                .output_dir
                .clone()
                .unwrap_or_else(|| self.output_dir.clone()),
            volume: raw.volume.unwrap_or(self.volume),
            plot_areas: raw.plot_areas.apply(&self.plot_areas),
            regeneration_count_columns: columns,
        }
    }

    /// Merge project config onto self with union semantics for arrays.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        self.overlay(overlay, true)
    }

    /// Apply global config onto defaults with REPLACE semantics for arrays.
    ///
    /// Defaults are just examples; the global config defines the real baseline.
    fn apply_global(&self, global: &RawSettings) -> Self {
        self.overlay(global, false)
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional project directory for local config
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE
    /// - Global → Project: UNION with negation support
    /// - Any → Env vars: REPLACE
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let global = global_config_path().filter(|p| p.exists());
        Self::load_from(global.as_deref(), project_dir)
    }

    /// Same as [`Settings::load`] with an explicit global config file.
    pub fn load_from(
        global_path: Option<&Path>,
        project_dir: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config (REPLACES defaults)
        if let Some(path) = global_path {
            let raw = load_raw_settings(path)?;
            current = current.apply_global(&raw);
        }

        // 3. Project config (UNION with global)
        if let Some(dir) = project_dir {
            let local_path = project_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 4. Environment variables (explicit override)
        current = Self::apply_env_overrides(current)?;

        current.expand_paths();
        current.validate()?;
        Ok(current)
    }

    /// Apply FLORYTICA_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("FLORYTICA")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("regeneration_count_columns")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_float("area_ha") {
            settings.area_ha = val;
        }
        if let Ok(val) = config.get_float("confidence") {
            settings.confidence = val;
        }
        if let Ok(val) = config.get_float("allowed_error") {
            settings.allowed_error = val;
        }
        if let Ok(val) = config.get::<SamplingVariable>("sampling_variable") {
            settings.sampling_variable = val;
        }
        if let Ok(val) = config.get_bool("parallel") {
            settings.parallel = val;
        }
        if let Ok(val) = config.get_string("output_dir") {
            settings.output_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get::<Vec<String>>("regeneration_count_columns") {
            settings.regeneration_count_columns = val;
        }
        for (key, slot) in [
            ("plot_areas.s1", &mut settings.plot_areas.s1),
            ("plot_areas.s2", &mut settings.plot_areas.s2),
            ("plot_areas.r1", &mut settings.plot_areas.r1),
            ("plot_areas.r2", &mut settings.plot_areas.r2),
            ("plot_areas.r3", &mut settings.plot_areas.r3),
        ] {
            if let Ok(val) = config.get_float(key) {
                *slot = val;
            }
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# florytica configuration
#
# Locations (by precedence, lowest to highest):
#   Global:  ~/.config/florytica/florytica.toml  (defines your baseline)
#   Project: <project_dir>/.florytica.toml       (inventory-specific values)
#   Env:     FLORYTICA_* environment variables    (explicit overrides)
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Project config UNIONS with global. Use "!name" to REMOVE an inherited item:
#     regeneration_count_columns = ["N_Ind", "!Qtde"]

# Total property area in hectares (0 = unknown, totals are skipped)
# area_ha = 0.0

# Confidence level and allowed error (%) of the sampling error
# confidence = 0.90
# allowed_error = 10.0

# Plot variable for sampling statistics: volume | basal_area | individuals
# sampling_variable = "volume"

# Process sampling levels in parallel
# parallel = false

# Directory for exported tables
# output_dir = "."

# Regeneration count column names (first present column is used)
# regeneration_count_columns = ["Nº de Ind.", "Num_Ind", "Qtde", "Quantidade"]

[volume]
# schumacher_hall: V = a × (DAP/100)^b × H^c
model = "schumacher_hall"
a = 1.3332
b = 2.0836
c = 0.732
# form_factor: V = g × H × factor
# model = "form_factor"
# factor = 0.7

[plot_areas]
# Plot area in m² per sampling level
# s2 = 500.0
# s1 = 100.0
# r3 = 25.0
# r2 = 4.0
# r1 = 1.0
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
