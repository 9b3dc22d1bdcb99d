//! Markdown inventory report.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::info;

use crate::application::services::ProcessedInventory;
use crate::application::{ApplicationResult, IoResultExt};
use crate::infrastructure::traits::FileSystem;

/// Trees listed in the report sample table.
pub const REPORT_TREE_SAMPLE: usize = 30;

fn num(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}")
}

fn opt(value: Option<f64>, decimals: usize) -> String {
    value.map(|v| num(v, decimals)).unwrap_or_else(|| "-".to_string())
}

/// Render the report; `generated_at` is printed in the header.
pub fn render_report(inventory: &ProcessedInventory, generated_at: DateTime<Local>) -> String {
    let p = &inventory.parameters;
    let mut out = String::new();

    // writes into a String cannot fail
    let _ = writeln!(out, "# Forest Inventory Report\n");
    let _ = writeln!(out, "Generated: {}\n", generated_at.format("%Y-%m-%d %H:%M"));

    let _ = writeln!(out, "## Parameters\n");
    let area = if p.area_ha > 0.0 {
        format!("{} ha", num(p.area_ha, 2))
    } else {
        "not informed".to_string()
    };
    let _ = writeln!(out, "- Property area: {area}");
    let _ = writeln!(out, "- Confidence: {}%", num(p.confidence * 100.0, 0));
    let _ = writeln!(out, "- Allowed error: {}%", num(p.allowed_error, 1));
    let _ = writeln!(
        out,
        "- Sampling variable: {:?} ({})",
        p.sampling_variable,
        p.sampling_variable.label()
    );
    let _ = writeln!(out, "- Volume equation: {}", p.volume.describe());
    let _ = writeln!(
        out,
        "- Records: {} rows, {} processed, {} rejected\n",
        inventory.rows,
        inventory.trees.len(),
        inventory.warnings.len()
    );

    if !inventory.warnings.is_empty() {
        let _ = writeln!(out, "## Rejected records\n");
        for w in &inventory.warnings {
            let _ = writeln!(out, "- {w}");
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "## Level indicators\n");
    let _ = writeln!(
        out,
        "| Level | Plots | FE | N/ha | G (m²/ha) | V (m³/ha) | N total | G total (m²) | V total (m³) |"
    );
    let _ = writeln!(out, "|---|---:|---:|---:|---:|---:|---:|---:|---:|");
    for l in &inventory.levels {
        let i = &l.indicators;
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} |",
            l.level,
            i.plots,
            opt(i.expansion_factor, 2),
            opt(i.individuals_ha, 1),
            opt(i.basal_area_ha, 4),
            opt(i.volume_ha, 4),
            opt(i.individuals_total, 0),
            opt(i.basal_area_total, 2),
            opt(i.volume_total, 2),
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Sampling statistics ({})\n", p.sampling_variable.label());
    let sampled: Vec<_> = inventory
        .levels
        .iter()
        .filter_map(|l| l.sampling.map(|s| (l.level, s)))
        .collect();
    if sampled.is_empty() {
        let _ = writeln!(out, "No level has two or more plots.\n");
    } else {
        let _ = writeln!(
            out,
            "| Level | n | Mean | s | CV (%) | SE | t | E (%) | CI | Meets | n required |"
        );
        let _ = writeln!(out, "|---|---:|---:|---:|---:|---:|---:|---:|---|---|---:|");
        for (level, s) in sampled {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} | {} | {} | [{}, {}] | {} | {} |",
                level,
                s.n,
                num(s.mean, 4),
                num(s.std_dev, 4),
                opt(s.cv_percent, 2),
                num(s.std_error, 4),
                num(s.t_value, 3),
                opt(s.relative_error_percent, 2),
                num(s.ci_lower, 4),
                num(s.ci_upper, 4),
                if s.meets(p.allowed_error) { "yes" } else { "no" },
                opt(s.required_units, 0),
            );
        }
        let _ = writeln!(out);
    }

    if !inventory.dap_distribution.is_empty() {
        let _ = writeln!(out, "## DAP distribution\n");
        let _ = writeln!(out, "| Class (cm) | Trees |");
        let _ = writeln!(out, "|---|---:|");
        for c in &inventory.dap_distribution {
            let _ = writeln!(out, "| {} | {} |", c.label, c.count);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "## Trees\n");
    let _ = writeln!(out, "| PF | Level | DAP (cm) | g (m²) | Vol (m³) | Z |");
    let _ = writeln!(out, "|---|---|---:|---:|---:|---:|");
    for t in inventory.trees.iter().take(REPORT_TREE_SAMPLE) {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            t.plot.as_deref().unwrap_or("-"),
            t.level,
            num(t.dap_cm, 2),
            num(t.basal_area_m2, 5),
            opt(t.volume_m3, 4),
            opt(t.z_score, 2),
        );
    }
    if inventory.trees.len() > REPORT_TREE_SAMPLE {
        let _ = writeln!(
            out,
            "\n_{} more trees in the tree export._",
            inventory.trees.len() - REPORT_TREE_SAMPLE
        );
    }
    out
}

/// Writes Markdown reports.
pub struct ReportService {
    fs: Arc<dyn FileSystem>,
}

impl ReportService {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    pub fn write(&self, inventory: &ProcessedInventory, path: &Path) -> ApplicationResult<()> {
        let content = render_report(inventory, Local::now());
        self.fs
            .ensure_parent(path)
            .with_path_context("create parent directory", path)?;
        self.fs
            .write(path, &content)
            .with_path_context("write report", path)?;
        info!("report written to {}", path.display());
        Ok(())
    }
}
