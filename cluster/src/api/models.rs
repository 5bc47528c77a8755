use common::{Error, GeoBounds, Result};
use serde::{Deserialize, Serialize};

// Request models
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ClusterQuery {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
    pub zoom: u32,
}

impl ClusterQuery {
    /// All five parameters are required; zero counts as missing.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("min_lat", self.min_lat == 0.0),
            ("max_lat", self.max_lat == 0.0),
            ("min_lng", self.min_lng == 0.0),
            ("max_lng", self.max_lng == 0.0),
            ("zoom", self.zoom == 0),
        ]
        .into_iter()
        .filter_map(|(name, is_missing)| is_missing.then_some(name))
        .collect();

        if !missing.is_empty() {
            return Err(Error::InvalidInput(format!(
                "missing or zero parameters: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    pub fn bounds(&self) -> GeoBounds {
        GeoBounds::new(self.min_lat, self.max_lat, self.min_lng, self.max_lng)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PropertyQuery {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
    pub limit: Option<usize>,
}

impl PropertyQuery {
    pub fn bounds(&self) -> GeoBounds {
        GeoBounds::new(self.min_lat, self.max_lat, self.min_lng, self.max_lng)
    }

    /// Absent or zero falls back to `default`.
    pub fn effective_limit(&self, default: usize) -> usize {
        match self.limit {
            Some(limit) if limit > 0 => limit,
            _ => default,
        }
    }
}

// Response models
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}
