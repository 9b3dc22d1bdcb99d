//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem) but are themselves
//! concrete structs, not traits.

mod export;
mod inventory;
mod report;

pub use export::{
    inventory_json, levels_csv, sampling_csv, trees_csv, ExportFormat, ExportService, JSON_FILE,
    LEVELS_FILE, SAMPLING_FILE, TREES_FILE,
};
pub use inventory::{
    plot_value, InventoryParameters, InventoryService, LevelSummary, ProcessedInventory,
    CLASS_LEVEL, DAP_CLASS_MINIMUM, HEIGHT_CLASS_MINIMUM,
};
pub use report::{render_report, ReportService, REPORT_TREE_SAMPLE};
