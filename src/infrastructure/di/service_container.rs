//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{ExportService, InventoryService, ReportService};
use crate::config::Settings;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        let settings = Arc::new(settings);

        Self { settings, fs }
    }

    pub fn inventory_service(&self) -> InventoryService {
        InventoryService::new(self.fs.clone(), self.settings.clone())
    }

    pub fn export_service(&self) -> ExportService {
        ExportService::new(self.fs.clone())
    }

    pub fn report_service(&self) -> ReportService {
        ReportService::new(self.fs.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::infrastructure::traits::MemoryFileSystem;

    #[test]
    fn given_memory_fs_when_processing_through_container_then_services_share_it() {
        let fs = Arc::new(
            MemoryFileSystem::new().with_file("/data/inv.csv", "Nivel,PF,CAP,HT\nS2,1,31.4,10\n"),
        );
        let container = ServiceContainer::with_deps(Settings::default(), fs.clone());

        let inventory = container
            .inventory_service()
            .process_file(Path::new("/data/inv.csv"))
            .unwrap();
        container
            .report_service()
            .write(&inventory, Path::new("/data/report.md"))
            .unwrap();

        assert_eq!(inventory.trees.len(), 1);
        assert!(fs.is_file(Path::new("/data/report.md")));
    }
}
