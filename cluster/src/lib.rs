pub mod api;
pub mod grid;
pub mod models;
pub mod projection;
pub mod services;

use common::config::Settings;
use common::storage::{SqliteConfig, SqliteReader};
use common::Result;
use services::ClusterService;
use std::sync::Arc;
use tracing::info;

/// Opens the store read side and builds the query service on top of it.
pub fn open_cluster_service(settings: &Settings) -> Result<ClusterService> {
    let reader = SqliteReader::open(&SqliteConfig::from(&settings.database))?;
    info!(database = %settings.database.path, "Opened listing store for queries");
    Ok(ClusterService::new(Arc::new(reader), &settings.clustering))
}
