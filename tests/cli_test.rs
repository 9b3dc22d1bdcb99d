//! Argument parsing tests for the `florytica` command line.

use std::path::PathBuf;

use clap::Parser;
use rstest::rstest;

use florytica::application::services::ExportFormat;
use florytica::cli::args::{CalcCommands, ConfigCommands};
use florytica::cli::{Cli, Commands};
use florytica::config::SamplingVariable;

#[test]
fn given_process_with_overrides_when_parsing_then_fields_set() {
    let cli = Cli::try_parse_from([
        "florytica",
        "-vv",
        "-C",
        "/data/fazenda",
        "process",
        "inventario.csv",
        "--area-ha",
        "120.5",
        "--variable",
        "basal-area",
        "--format",
        "json",
        "--parallel",
    ])
    .unwrap();

    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.project_dir, Some(PathBuf::from("/data/fazenda")));
    match cli.command {
        Some(Commands::Process {
            inventory, format, ..
        }) => {
            assert_eq!(inventory.input, PathBuf::from("inventario.csv"));
            assert_eq!(inventory.area_ha, Some(120.5));
            assert_eq!(inventory.variable, Some(SamplingVariable::BasalArea));
            assert!(inventory.parallel);
            assert_eq!(format, ExportFormat::Json);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn given_negative_sample_when_parsing_z_score_then_accepted() {
    let cli = Cli::try_parse_from(["florytica", "calc", "z-score", "-1.5", "2", "0.5"]).unwrap();
    match cli.command {
        Some(Commands::Calc {
            command:
                CalcCommands::ZScore {
                    sample_mean,
                    population_mean,
                    std_dev,
                },
        }) => {
            assert_eq!(sample_mean, -1.5);
            assert_eq!(population_mean, 2.0);
            assert_eq!(std_dev, 0.5);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[rstest]
#[case(&["florytica", "calc", "dap", "31.4"])]
#[case(&["florytica", "calc", "basal-area", "10"])]
#[case(&["florytica", "calc", "volume", "30", "--total-height", "20"])]
#[case(&["florytica", "calc", "sampling-error", "2", "1.7", "20"])]
#[case(&["florytica", "calc", "expansion-factor", "10000", "1000"])]
#[case(&["florytica", "levels"])]
#[case(&["florytica", "report", "sheet.csv", "-o", "out/report.md"])]
#[case(&["florytica", "completion", "bash"])]
fn given_valid_invocation_when_parsing_then_ok(#[case] args: &[&str]) {
    assert!(Cli::try_parse_from(args).is_ok());
}

#[test]
fn given_config_init_global_when_parsing_then_flag_set() {
    let cli = Cli::try_parse_from(["florytica", "config", "init", "--global"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Config {
            command: ConfigCommands::Init { global: true }
        })
    ));
}

#[test]
fn given_process_without_input_when_parsing_then_error() {
    assert!(Cli::try_parse_from(["florytica", "process"]).is_err());
}
