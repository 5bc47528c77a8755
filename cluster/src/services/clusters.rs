use common::config::ClusteringConfig;
use common::model::StoredListing;
use common::storage::ListingSource;
use common::Result;
use std::sync::Arc;
use tracing::debug;

use crate::api::models::{ClusterQuery, PropertyQuery};
use crate::grid::{GridConfig, aggregate};
use crate::models::ClusterSummary;

/// Answers map queries against a read-only listing source. Holds no mutable
/// state, so one instance can serve concurrent requests.
pub struct ClusterService {
    source: Arc<dyn ListingSource>,
    grid: GridConfig,
    default_limit: usize,
}

impl ClusterService {
    pub fn new(source: Arc<dyn ListingSource>, config: &ClusteringConfig) -> Self {
        Self {
            source,
            grid: GridConfig::from(config),
            default_limit: config.default_limit.max(1),
        }
    }

    pub async fn clusters(&self, query: &ClusterQuery) -> Result<Vec<ClusterSummary>> {
        query.validate()?;

        let viewport = query.bounds();
        let points = self.source.points_in_bounds(viewport).await?;
        let clusters = aggregate(&points, &viewport, query.zoom, &self.grid);

        debug!(
            zoom = query.zoom,
            cell_size_m = self.grid.cell_size(query.zoom),
            points = points.len(),
            clusters = clusters.len(),
            "Clustered viewport"
        );
        Ok(clusters)
    }

    pub async fn properties(&self, query: &PropertyQuery) -> Result<Vec<StoredListing>> {
        let limit = query.effective_limit(self.default_limit);
        let listings = self.source.listings_in_bounds(query.bounds(), limit).await?;
        debug!(limit, returned = listings.len(), "Listed properties");
        Ok(listings)
    }
}
