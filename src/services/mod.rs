//! Business logic services

pub mod catalog;
pub mod lending;
pub mod reports;

use crate::{
    config::ReportsConfig,
    repository::{snapshots::SnapshotDirectory, Repository},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub lending: lending::LendingService,
    pub reports: reports::ReportsService,
}

impl Services {
    /// Create all services with the given repository.
    ///
    /// Spawns the report worker, so it must run inside a Tokio runtime.
    pub fn new(repository: Repository, reports_config: &ReportsConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            lending: lending::LendingService::new(repository.clone()),
            reports: reports::ReportsService::start(
                repository,
                SnapshotDirectory::new(reports_config.directory.clone()),
                reports_config.queue_capacity,
            ),
        }
    }
}
