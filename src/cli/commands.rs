//! Command dispatch and handlers

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use tracing::{debug, instrument};

use crate::application::services::{ExportFormat, ProcessedInventory};
use crate::cli::args::{CalcCommands, Cli, Commands, ConfigCommands, InventoryArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_dir, global_config_path, project_config_path, Settings};
use crate::domain::{
    compute_basal_area, compute_dap, compute_expansion_factor, compute_sampling_error,
    compute_volume, compute_z_score, PlotAreas, SamplingLevel,
};
use crate::infrastructure::{InfraError, ServiceContainer};

/// Default report file name below the output directory.
pub const REPORT_FILE: &str = "inventory_report.md";

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Process {
            inventory,
            output_dir,
            format,
        }) => cmd_process(cli, inventory, output_dir.as_deref(), *format),
        Some(Commands::Report { inventory, output }) => {
            cmd_report(cli, inventory, output.as_deref())
        }
        Some(Commands::Calc { command }) => cmd_calc(cli, command),
        Some(Commands::Levels) => cmd_levels(cli),
        Some(Commands::Config { command }) => cmd_config(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "florytica", &mut io::stdout());
            Ok(())
        }
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()
                .map_err(|e| CliError::Infra(InfraError::io("print help", e)))?;
            Ok(())
        }
    }
}

// ============================================================
// Settings
// ============================================================

fn project_dir(cli: &Cli) -> Option<PathBuf> {
    cli.project_dir
        .clone()
        .or_else(|| std::env::current_dir().ok())
}

/// Layered settings for the project directory.
pub fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let dir = project_dir(cli);
    debug!("load_settings: project_dir={:?}", dir);
    Ok(Settings::load(dir.as_deref())?)
}

/// Apply command line flags on top of the loaded settings.
pub fn apply_overrides(settings: &mut Settings, args: &InventoryArgs) -> CliResult<()> {
    if let Some(area) = args.area_ha {
        settings.area_ha = area;
    }
    if let Some(confidence) = args.confidence {
        settings.confidence = confidence;
    }
    if let Some(allowed) = args.allowed_error {
        settings.allowed_error = allowed;
    }
    if let Some(variable) = args.variable {
        settings.sampling_variable = variable;
    }
    if args.parallel {
        settings.parallel = true;
    }
    settings
        .validate()
        .map_err(|e| CliError::InvalidArgs(e.to_string()))
}

fn process_inventory(
    cli: &Cli,
    args: &InventoryArgs,
) -> CliResult<(ServiceContainer, ProcessedInventory)> {
    let mut settings = load_settings(cli)?;
    apply_overrides(&mut settings, args)?;
    let container = ServiceContainer::new(settings);
    let inventory = container.inventory_service().process_file(&args.input)?;
    for warning in &inventory.warnings {
        output::warning(warning);
    }
    Ok((container, inventory))
}

// ============================================================
// Commands
// ============================================================

#[instrument(skip(cli))]
fn cmd_process(
    cli: &Cli,
    args: &InventoryArgs,
    output_dir: Option<&Path>,
    format: ExportFormat,
) -> CliResult<()> {
    let (container, inventory) = process_inventory(cli, args)?;
    print_summary(&inventory);

    let dir = output_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| container.settings.output_dir.clone());
    let written = container
        .export_service()
        .export(&inventory, format, &dir)?;
    output::action("Exported", &dir.display());
    for path in written {
        output::success_detail(&path.display());
    }
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_report(cli: &Cli, args: &InventoryArgs, output: Option<&Path>) -> CliResult<()> {
    let (container, inventory) = process_inventory(cli, args)?;
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| container.settings.output_dir.join(REPORT_FILE));
    container.report_service().write(&inventory, &path)?;
    output::success(&format!("Report written: {}", path.display()));
    Ok(())
}

fn print_summary(inventory: &ProcessedInventory) {
    let p = &inventory.parameters;
    output::header(&format!(
        "{} trees processed, {} rejected",
        inventory.trees.len(),
        inventory.warnings.len()
    ));
    let fmt = |v: Option<f64>, d: usize| {
        v.map(|v| format!("{v:.d$}"))
            .unwrap_or_else(|| "-".to_string())
    };
    for level in &inventory.levels {
        let i = &level.indicators;
        output::info(&format!(
            "{}: {} plot(s), FE {}, {} ind/ha, {} m²/ha, {} m³/ha",
            level.level,
            i.plots,
            fmt(i.expansion_factor, 2),
            fmt(i.individuals_ha, 1),
            fmt(i.basal_area_ha, 4),
            fmt(i.volume_ha, 4),
        ));
        match level.sampling {
            Some(s) if s.meets(p.allowed_error) => output::success_detail(&format!(
                "sampling error {}% within {}%",
                fmt(s.relative_error_percent, 2),
                p.allowed_error
            )),
            Some(s) => output::failure(&format!(
                "sampling error {}% above {}% ({} plots required)",
                fmt(s.relative_error_percent, 2),
                p.allowed_error,
                fmt(s.required_units, 0)
            )),
            None => output::detail("fewer than two plots, no sampling error"),
        }
    }
}

#[instrument(skip(cli))]
fn cmd_calc(cli: &Cli, command: &CalcCommands) -> CliResult<()> {
    let (label, value, unit) = match command {
        CalcCommands::Dap { cap } => ("DAP", compute_dap(*cap)?, "cm"),
        CalcCommands::BasalArea { dap } => {
            if !(*dap > 0.0) {
                return Err(CliError::InvalidArgs(format!("DAP must be > 0, got {dap}")));
            }
            ("Basal area", compute_basal_area(*dap), "m²")
        }
        CalcCommands::Volume {
            dap,
            total_height,
            commercial_height,
        } => {
            if !(*dap > 0.0) {
                return Err(CliError::InvalidArgs(format!("DAP must be > 0, got {dap}")));
            }
            let settings = load_settings(cli)?;
            let volume = compute_volume(
                &settings.volume,
                *total_height,
                *commercial_height,
                compute_basal_area(*dap),
            );
            debug!("volume: {:?} ({})", volume, settings.volume.describe());
            let base = volume.base().ok_or_else(|| {
                CliError::InvalidArgs("a positive total or commercial height is required".into())
            })?;
            ("Volume", base, "m³")
        }
        CalcCommands::ZScore {
            sample_mean,
            population_mean,
            std_dev,
        } => (
            "Z",
            compute_z_score(*sample_mean, *population_mean, *std_dev)?,
            "",
        ),
        CalcCommands::SamplingError {
            std_error,
            t_value,
            mean,
        } => (
            "Sampling error",
            compute_sampling_error(*std_error, *t_value, *mean)?,
            "%",
        ),
        CalcCommands::ExpansionFactor {
            total_area,
            sampled_area,
        } => (
            "Expansion factor",
            compute_expansion_factor(*total_area, *sampled_area)?,
            "",
        ),
    };
    output::metric(label, value, unit);
    Ok(())
}

/// Nesting of the sampling levels, outermost plot at the root.
pub fn level_tree(areas: &PlotAreas) -> termtree::Tree<String> {
    let label = |level: SamplingLevel| {
        let area = areas.area(level);
        let kind = if level.is_regeneration() {
            "regeneration"
        } else {
            "trees"
        };
        format!("{level} ({area} m², {kind})")
    };
    let mut order = areas.nesting_order();
    let innermost = order.pop().map(label).unwrap_or_default();
    order
        .into_iter()
        .rev()
        .fold(termtree::Tree::new(innermost), |child, level| {
            termtree::Tree::new(label(level)).with_leaves([child])
        })
}

#[instrument(skip(cli))]
fn cmd_levels(cli: &Cli) -> CliResult<()> {
    let settings = load_settings(cli)?;
    output::info(&level_tree(&settings.plot_areas));
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".into())
                })?
            } else {
                let dir = project_dir(cli)
                    .ok_or_else(|| CliError::Usage("cannot determine project directory".into()))?;
                project_config_path(&dir)
            };
            if path.exists() {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| InfraError::io(format!("create {}", parent.display()), e))?;
            }
            std::fs::write(&path, Settings::template())
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::success(&format!("Created {}", path.display()));
            Ok(())
        }
        ConfigCommands::Path => {
            match global_config_dir() {
                Some(dir) => output::action("Global", &dir.join("florytica.toml").display()),
                None => output::warning("cannot determine global config directory"),
            }
            if let Some(dir) = project_dir(cli) {
                output::action("Project", &project_config_path(&dir).display());
            }
            Ok(())
        }
    }
}
