use serde::{Deserialize, Serialize};

/// Aggregated view of every point that fell into one grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster_id: String,
    pub center_lat: f64,
    pub center_lng: f64,
    pub point_count: u64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}
