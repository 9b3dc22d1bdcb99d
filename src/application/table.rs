//! Field sheet parsing: CSV text into validated tree measurements.
//!
//! Column names are matched case-insensitively after trimming. Rows that
//! cannot enter the computation are collected as [`RecordWarning`]s and the
//! remaining rows are kept.

use tracing::{debug, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{RecordWarning, SamplingLevel, TreeMeasurement};

pub const LEVEL_COLUMN: &str = "Nivel";
pub const CAP_COLUMN: &str = "CAP";
pub const PLOT_COLUMN: &str = "PF";
pub const TOTAL_HEIGHT_COLUMN: &str = "HT";
pub const COMMERCIAL_HEIGHT_COLUMN: &str = "HC";

/// Parsed field sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryTable {
    /// Accepted records, in source order
    pub records: Vec<TreeMeasurement>,
    /// Rejected records
    pub warnings: Vec<RecordWarning>,
    /// Data rows in the source (accepted + rejected)
    pub rows: usize,
    pub has_plot_column: bool,
    pub has_total_height: bool,
    /// Regeneration count column in use, if any
    pub count_column: Option<String>,
}

#[derive(Debug)]
struct ColumnMap {
    level: usize,
    cap: usize,
    plot: Option<usize>,
    total_height: Option<usize>,
    commercial_height: Option<usize>,
    count: Option<(usize, String)>,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord, count_columns: &[String]) -> ApplicationResult<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
        };

        let level = find(LEVEL_COLUMN);
        let cap = find(CAP_COLUMN);
        let (level, cap) = match (level, cap) {
            (Some(l), Some(c)) => (l, c),
            (l, c) => {
                let mut columns = Vec::new();
                if l.is_none() {
                    columns.push(LEVEL_COLUMN.to_string());
                }
                if c.is_none() {
                    columns.push(CAP_COLUMN.to_string());
                }
                return Err(ApplicationError::MissingColumns { columns });
            }
        };

        let count = count_columns
            .iter()
            .find_map(|name| find(name).map(|idx| (idx, name.clone())));

        Ok(Self {
            level,
            cap,
            plot: find(PLOT_COLUMN),
            total_height: find(TOTAL_HEIGHT_COLUMN),
            commercial_height: find(COMMERCIAL_HEIGHT_COLUMN),
            count,
        })
    }
}

/// Pick `;` when the header has more semicolons than commas.
pub fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Parse a spreadsheet number; accepts a decimal comma (`31,4`).
///
/// Empty cells yield `Ok(None)`, unparsable cells an error with the raw text.
pub fn parse_number(cell: &str) -> Result<Option<f64>, String> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") || cell == "-" {
        return Ok(None);
    }
    let normalized = if cell.contains(',') && !cell.contains('.') {
        cell.replace(',', ".")
    } else {
        cell.to_string()
    };
    normalized
        .parse::<f64>()
        .map(Some)
        .map_err(|_| cell.to_string())
}

impl InventoryTable {
    /// Parse CSV `content`.
    ///
    /// # Errors
    /// Missing `Nivel`/`CAP` columns or malformed CSV. Invalid rows are not
    /// errors; they end up in `warnings`.
    pub fn parse(content: &str, count_columns: &[String]) -> ApplicationResult<Self> {
        let content = content.trim_start_matches('\u{feff}');
        let delimiter = detect_delimiter(content);
        debug!("parse: delimiter={:?}", delimiter as char);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = reader.headers()?.clone();
        let columns = ColumnMap::resolve(&headers, count_columns)?;
        debug!("parse: columns={:?}", columns);

        let mut table = Self {
            records: Vec::new(),
            warnings: Vec::new(),
            rows: 0,
            has_plot_column: columns.plot.is_some(),
            has_total_height: columns.total_height.is_some(),
            count_column: columns.count.as_ref().map(|(_, name)| name.clone()),
        };

        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            let row = idx + 1;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            table.rows += 1;
            match read_row(row, &record, &columns) {
                Ok(measurement) => table.records.push(measurement),
                Err(warning) => {
                    warn!("rejected {}", warning);
                    table.warnings.push(warning);
                }
            }
        }

        debug!(
            "parse: {} rows, {} accepted, {} rejected",
            table.rows,
            table.records.len(),
            table.warnings.len()
        );
        Ok(table)
    }
}

fn read_row(
    row: usize,
    record: &csv::StringRecord,
    columns: &ColumnMap,
) -> Result<TreeMeasurement, RecordWarning> {
    let cell = |idx: usize| record.get(idx).unwrap_or_default();
    let reject = |level: Option<SamplingLevel>, reason: String| RecordWarning { row, level, reason };

    let level: SamplingLevel = cell(columns.level)
        .parse()
        .map_err(|e: crate::domain::DomainError| reject(None, e.to_string()))?;
    let number = |idx: Option<usize>, name: &str| -> Result<Option<f64>, RecordWarning> {
        match idx {
            Some(idx) => parse_number(cell(idx))
                .map_err(|raw| reject(Some(level), format!("invalid {name} value {raw:?}"))),
            None => Ok(None),
        }
    };

    let cap = number(Some(columns.cap), CAP_COLUMN)?
        .ok_or_else(|| reject(Some(level), "missing CAP".to_string()))?;
    let total_height_m = number(columns.total_height, TOTAL_HEIGHT_COLUMN)?;
    let commercial_height_m = number(columns.commercial_height, COMMERCIAL_HEIGHT_COLUMN)?;

    let count = match &columns.count {
        Some((idx, name)) if level.is_regeneration() => {
            Some(number(Some(*idx), name)?.unwrap_or(0.0))
        }
        _ => None,
    };

    let plot = columns
        .plot
        .map(|idx| cell(idx).trim().to_string())
        .filter(|p| !p.is_empty());

    let measurement = TreeMeasurement {
        row,
        level,
        plot,
        cap_cm: cap,
        total_height_m,
        commercial_height_m,
        count,
    };
    measurement
        .validate()
        .map_err(|e| reject(Some(level), e.to_string()))?;
    Ok(measurement)
}
