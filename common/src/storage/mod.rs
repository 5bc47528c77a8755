pub mod sqlite;

use async_trait::async_trait;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::model::{GeoBounds, Listing, PricedPoint, StoredListing};
use crate::Result;

pub use sqlite::{SqliteConnector, SqliteReader, SqliteSession};

#[derive(Clone, Debug)]
pub struct SqliteConfig {
    pub path: String,
    pub busy_timeout: Duration,
}

impl From<&DatabaseConfig> for SqliteConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            path: config.path.clone(),
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        }
    }
}

/// Opens new, exclusively owned store sessions. Every load worker calls
/// `connect` once and keeps the session for its whole lifetime.
pub trait Connector: Send + Sync + 'static {
    type Session: LoadSession + 'static;

    fn connect(&self) -> Result<Self::Session>;
}

/// Write side of the store as seen by one load worker.
pub trait LoadSession: Send {
    /// Removes every stored listing. Runs once before a load.
    fn clear_all(&mut self) -> Result<()>;
    fn begin(&mut self) -> Result<()>;
    fn insert(&mut self, listing: &Listing) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;
}

/// Read side of the store, shared by concurrent queries.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Raw points whose coordinates fall inside `bounds`.
    async fn points_in_bounds(&self, bounds: GeoBounds) -> Result<Vec<PricedPoint>>;

    /// Stored listings inside `bounds`, at most `limit` of them.
    async fn listings_in_bounds(
        &self,
        bounds: GeoBounds,
        limit: usize,
    ) -> Result<Vec<StoredListing>>;
}
