pub mod models;

pub use models::{ApiResponse, ClusterQuery, PropertyQuery};
