pub mod batcher;
pub mod coordinator;
pub mod models;
pub mod parser;
pub mod progress;
pub mod worker;

#[cfg(test)]
mod testing;

use common::config::Settings;
use common::storage::{Connector, SqliteConfig, SqliteConnector};
use common::Result;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use tracing::info;

pub use coordinator::IngestCoordinator;
pub use models::{Batch, LoadReport};
pub use parser::{ColumnMap, ListingReader};

/// Runs a complete load: validates the input header, prepares and clears the
/// store, then streams every row through the worker pool.
pub async fn run_load_pipeline(settings: &Settings) -> Result<LoadReport> {
    let ingest = &settings.ingest;
    ingest.validate()?;

    // Input problems are fatal and surface before anything is deleted.
    let file = File::open(&ingest.input_path)?;
    let reader = ListingReader::new(BufReader::new(file), ingest.delimiter as u8)?;
    info!(input = %ingest.input_path, columns = ?reader.columns(), "Found required columns");

    let connector = Arc::new(SqliteConnector::new(SqliteConfig::from(&settings.database)));

    let schema_connector = Arc::clone(&connector);
    tokio::task::spawn_blocking(move || schema_connector.connect()?.ensure_schema()).await??;
    info!(database = %settings.database.path, "Connected to store");

    let coordinator = IngestCoordinator::new(connector, ingest.clone());
    coordinator.clear_store().await?;
    coordinator.run(reader).await
}
