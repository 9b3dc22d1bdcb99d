//! Integration tests for Settings config loading with layered merge semantics.
//!
//! Merge Semantics:
//! - Defaults → Global: REPLACE (global defines the real baseline)
//! - Global → Project: UNION with negation support
//! - Any → Env vars: REPLACE (explicit user override)

use std::fs;

use tempfile::TempDir;

use florytica::application::ApplicationError;
use florytica::config::{project_config_path, SamplingVariable, Settings};
use florytica::domain::VolumeEquation;

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write config");
    path
}

#[test]
fn given_no_config_files_when_load_then_defaults() {
    let project = TempDir::new().unwrap();
    let settings = Settings::load_from(None, Some(project.path())).expect("load settings");
    assert_eq!(settings, Settings::default());
}

#[test]
fn given_global_columns_when_load_then_replaces_defaults() {
    let global_dir = TempDir::new().unwrap();
    let global = write(
        &global_dir,
        "florytica.toml",
        r#"
regeneration_count_columns = ["N_Ind"]
confidence = 0.95
"#,
    );

    let settings = Settings::load_from(Some(&global), None).expect("load settings");

    assert_eq!(settings.regeneration_count_columns, vec!["N_Ind".to_string()]);
    assert_eq!(settings.confidence, 0.95);
}

#[test]
fn given_project_columns_with_negation_when_load_then_unions_with_global() {
    let global_dir = TempDir::new().unwrap();
    let global = write(
        &global_dir,
        "florytica.toml",
        r#"regeneration_count_columns = ["Qtde", "Num_Ind"]"#,
    );
    let project = TempDir::new().unwrap();
    fs::write(
        project_config_path(project.path()),
        r#"
regeneration_count_columns = ["!Qtde", "Indiv"]
area_ha = 42.5
sampling_variable = "basal_area"

[plot_areas]
s2 = 400.0
"#,
    )
    .unwrap();

    let settings = Settings::load_from(Some(&global), Some(project.path())).expect("load settings");

    assert_eq!(
        settings.regeneration_count_columns,
        vec!["Num_Ind".to_string(), "Indiv".to_string()]
    );
    assert_eq!(settings.area_ha, 42.5);
    assert_eq!(settings.sampling_variable, SamplingVariable::BasalArea);
    assert_eq!(settings.plot_areas.s2, 400.0);
    assert_eq!(settings.plot_areas.s1, 100.0);
}

#[test]
fn given_volume_table_when_load_then_equation_selected() {
    let project = TempDir::new().unwrap();
    fs::write(
        project_config_path(project.path()),
        r#"
[volume]
model = "form_factor"
factor = 0.65
"#,
    )
    .unwrap();

    let settings = Settings::load_from(None, Some(project.path())).expect("load settings");

    assert_eq!(settings.volume, VolumeEquation::FormFactor { factor: 0.65 });
}

#[test]
fn given_invalid_value_when_load_then_config_error() {
    let project = TempDir::new().unwrap();
    fs::write(project_config_path(project.path()), "allowed_error = 0.0\n").unwrap();

    let err = Settings::load_from(None, Some(project.path())).unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }));
}

#[test]
fn given_malformed_toml_when_load_then_config_error_names_file() {
    let project = TempDir::new().unwrap();
    fs::write(project_config_path(project.path()), "area_ha = [\n").unwrap();

    let err = Settings::load_from(None, Some(project.path())).unwrap_err();

    assert!(err.to_string().contains(".florytica.toml"));
}

#[test]
fn given_settings_when_round_tripping_toml_then_equal() {
    let settings = Settings {
        area_ha: 7.0,
        volume: VolumeEquation::Spurr { a: 0.01, b: 0.45 },
        ..Settings::default()
    };
    let project = TempDir::new().unwrap();
    fs::write(
        project_config_path(project.path()),
        settings.to_toml().unwrap(),
    )
    .unwrap();

    let loaded = Settings::load_from(None, Some(project.path())).expect("load settings");

    assert_eq!(loaded.area_ha, 7.0);
    assert_eq!(loaded.volume, settings.volume);
}
