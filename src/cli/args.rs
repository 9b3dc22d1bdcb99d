//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

use crate::application::services::ExportFormat;
use crate::config::SamplingVariable;

/// Forestry inventory processing: DAP, basal area, volume, sampling error and per-level indicators
#[derive(Parser, Debug)]
#[command(name = "florytica")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Project directory (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Overrides of the inventory settings.
#[derive(Args, Debug, Default, Clone)]
pub struct InventoryArgs {
    /// Field sheet (CSV)
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Total property area (ha)
    #[arg(long)]
    pub area_ha: Option<f64>,

    /// Confidence level (0..1)
    #[arg(long)]
    pub confidence: Option<f64>,

    /// Allowed sampling error (%)
    #[arg(long)]
    pub allowed_error: Option<f64>,

    /// Plot variable for sampling statistics
    #[arg(long, value_enum)]
    pub variable: Option<SamplingVariable>,

    /// Process levels in parallel
    #[arg(long)]
    pub parallel: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute metrics and export tree, level and sampling tables
    Process {
        #[command(flatten)]
        inventory: InventoryArgs,

        /// Output directory (default: config output_dir)
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        output_dir: Option<PathBuf>,

        /// Export format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
    },

    /// Write a Markdown inventory report
    Report {
        #[command(flatten)]
        inventory: InventoryArgs,

        /// Report file (default: <output_dir>/inventory_report.md)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Evaluate a single formula
    Calc {
        #[command(subcommand)]
        command: CalcCommands,
    },

    /// Show the sampling levels and their plot areas
    Levels,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum CalcCommands {
    /// DAP (cm) from CAP (cm)
    Dap {
        /// Circumference at breast height (cm)
        cap: f64,
    },

    /// Basal area (m²) from DAP (cm)
    BasalArea {
        /// Diameter at breast height (cm)
        dap: f64,
    },

    /// Stem volume (m³) with the configured equation
    Volume {
        /// Diameter at breast height (cm)
        dap: f64,
        /// Total height (m)
        #[arg(long)]
        total_height: Option<f64>,
        /// Commercial height (m)
        #[arg(long)]
        commercial_height: Option<f64>,
    },

    /// (sample - population) / std_dev
    ZScore {
        #[arg(allow_negative_numbers = true)]
        sample_mean: f64,
        #[arg(allow_negative_numbers = true)]
        population_mean: f64,
        std_dev: f64,
    },

    /// Relative sampling error (%) = t · se / mean · 100
    SamplingError {
        std_error: f64,
        t_value: f64,
        mean: f64,
    },

    /// total_area / sampled_area
    ExpansionFactor {
        total_area: f64,
        sampled_area: f64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
