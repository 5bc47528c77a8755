use common::config::ClusteringConfig;
use common::{GeoBounds, PricedPoint};
use std::collections::BTreeMap;

use crate::models::ClusterSummary;
use crate::projection::{PlanarPoint, WORLD_EXTENT_M, to_geographic, to_planar};

/// Tile edge of the standard map pyramid, in pixels.
pub const TILE_SIZE_PX: f64 = 256.0;

/// Finest pyramid level (zoom plus bias) used for cell sizing. Deeper levels
/// reuse it, which keeps cell indices exact in `f64` and inside `i64`.
pub const MAX_GRID_LEVEL: u32 = 40;

/// Tuning knobs for the cell resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
    /// Levels added to the requested zoom before sizing cells.
    pub zoom_bias: u32,
    /// Cell edge in screen pixels at the biased zoom.
    pub cell_size_px: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            zoom_bias: 2,
            cell_size_px: 256,
        }
    }
}

impl From<&ClusteringConfig> for GridConfig {
    fn from(config: &ClusteringConfig) -> Self {
        Self {
            zoom_bias: config.zoom_bias,
            cell_size_px: config.cell_size_px.max(1),
        }
    }
}

impl GridConfig {
    /// Cell edge in projected metres. Halves with every zoom level until the
    /// biased level reaches `MAX_GRID_LEVEL`, then stays put.
    pub fn cell_size(&self, zoom: u32) -> f64 {
        let level = zoom.saturating_add(self.zoom_bias).min(MAX_GRID_LEVEL) as i32;
        let metres_per_px = WORLD_EXTENT_M / (TILE_SIZE_PX * 2f64.powi(level));
        f64::from(self.cell_size_px) * metres_per_px
    }
}

/// Viewport in projected metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl PlanarBounds {
    /// Projects the two corners. An inverted viewport stays inverted and
    /// contains nothing.
    pub fn from_geo(bounds: &GeoBounds) -> Self {
        let low = to_planar(bounds.min_lat, bounds.min_lng);
        let high = to_planar(bounds.max_lat, bounds.max_lng);
        Self {
            min_x: low.x,
            min_y: low.y,
            max_x: high.x,
            max_y: high.y,
        }
    }

    pub fn contains(&self, point: PlanarPoint) -> bool {
        point.x >= self.min_x && point.x <= self.max_x && point.y >= self.min_y && point.y <= self.max_y
    }
}

#[derive(Debug)]
struct CellStats {
    count: u64,
    sum_x: f64,
    sum_y: f64,
    sum_price: f64,
    min_price: f64,
    max_price: f64,
}

impl CellStats {
    fn new() -> Self {
        Self {
            count: 0,
            sum_x: 0.0,
            sum_y: 0.0,
            sum_price: 0.0,
            min_price: f64::INFINITY,
            max_price: f64::NEG_INFINITY,
        }
    }

    fn add(&mut self, point: PlanarPoint, price: f64) {
        self.count += 1;
        self.sum_x += point.x;
        self.sum_y += point.y;
        self.sum_price += price;
        self.min_price = self.min_price.min(price);
        self.max_price = self.max_price.max(price);
    }

    fn summarize(&self, cell: (i64, i64), size: f64) -> ClusterSummary {
        let n = self.count as f64;
        let (center_lat, center_lng) = to_geographic(PlanarPoint {
            x: self.sum_x / n,
            y: self.sum_y / n,
        });

        ClusterSummary {
            cluster_id: cell_id(cell, size),
            center_lat,
            center_lng,
            point_count: self.count,
            avg_price: self.sum_price / n,
            min_price: self.min_price,
            max_price: self.max_price,
        }
    }
}

/// Index of the cell containing `point`. Cells are half-open
/// `[k * size, (k + 1) * size)` on both axes, so every cell at one zoom level
/// lies inside exactly one cell of the level below.
pub fn cell_of(point: PlanarPoint, size: f64) -> (i64, i64) {
    ((point.x / size).floor() as i64, (point.y / size).floor() as i64)
}

/// WKT of the snapped cell origin, the lower-left corner of the cell.
///
/// Snapping floors rather than rounding to the nearest multiple of `size`, so
/// ids are offset by half a cell from a round-to-nearest grid. Flooring keeps
/// cells nested across zoom levels, which is what makes the cluster count
/// non-decreasing in zoom.
pub fn cell_id(cell: (i64, i64), size: f64) -> String {
    format!("POINT({} {})", cell.0 as f64 * size, cell.1 as f64 * size)
}

/// Buckets every point whose projection falls inside `viewport` into grid
/// cells and reduces each bucket to a summary.
///
/// Output is ordered by cell, x first. Points outside the projected viewport
/// are ignored, so an inverted or empty viewport yields no clusters.
pub fn aggregate(
    points: &[PricedPoint],
    viewport: &GeoBounds,
    zoom: u32,
    config: &GridConfig,
) -> Vec<ClusterSummary> {
    let size = config.cell_size(zoom);
    let bounds = PlanarBounds::from_geo(viewport);

    let mut cells: BTreeMap<(i64, i64), CellStats> = BTreeMap::new();
    for point in points {
        let planar = to_planar(point.latitude, point.longitude);
        if !bounds.contains(planar) {
            continue;
        }
        cells
            .entry(cell_of(planar, size))
            .or_insert_with(CellStats::new)
            .add(planar, point.price);
    }

    cells
        .iter()
        .map(|(cell, stats)| stats.summarize(*cell, size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDE: GeoBounds = GeoBounds {
        min_lat: -80.0,
        max_lat: 80.0,
        min_lng: -179.0,
        max_lng: 179.0,
    };

    fn point(id: i64, latitude: f64, longitude: f64, price: f64) -> PricedPoint {
        PricedPoint {
            id,
            latitude,
            longitude,
            price,
        }
    }

    fn at_planar(id: i64, x: f64, y: f64, price: f64) -> PricedPoint {
        let (lat, lng) = to_geographic(PlanarPoint { x, y });
        point(id, lat, lng, price)
    }

    /// Deterministic spread of points around Novosibirsk.
    fn scatter(n: i64) -> Vec<PricedPoint> {
        (0..n)
            .map(|i| {
                let lat = 54.8 + ((i * 37) % 101) as f64 * 0.004;
                let lng = 82.7 + ((i * 53) % 97) as f64 * 0.006;
                point(i, lat, lng, 1_000_000.0 + (i % 13) as f64 * 50_000.0)
            })
            .collect()
    }

    fn total(clusters: &[ClusterSummary]) -> u64 {
        clusters.iter().map(|c| c.point_count).sum()
    }

    #[test]
    fn test_cell_size_halves_per_zoom_level() {
        let config = GridConfig::default();
        // Bias of two levels: zoom 0 cells are a quarter of the world.
        assert!((config.cell_size(0) - WORLD_EXTENT_M / 4.0).abs() < 1e-6);
        for zoom in 0..20 {
            let ratio = config.cell_size(zoom) / config.cell_size(zoom + 1);
            assert!((ratio - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_deep_zoom_stops_at_finest_level() {
        let config = GridConfig::default();
        let cap = MAX_GRID_LEVEL - config.zoom_bias;
        assert_eq!(config.cell_size(cap + 1), config.cell_size(cap));
        assert_eq!(config.cell_size(u32::MAX), config.cell_size(cap));
        assert!(config.cell_size(cap) > 0.0);

        // About 1.1 km apart.
        let points = vec![
            point(1, 55.00, 83.00, 1_000.0),
            point(2, 55.01, 83.00, 2_000.0),
        ];
        let at_cap = aggregate(&points, &WIDE, cap, &config);
        assert_eq!(at_cap.len(), 2);
        for zoom in [cap - 1, cap + 1, 63, 70, 100, u32::MAX] {
            let clusters = aggregate(&points, &WIDE, zoom, &config);
            assert_eq!(clusters.len(), 2, "zoom {zoom}");
        }
        assert_eq!(aggregate(&points, &WIDE, 100, &config), at_cap);
    }

    #[test]
    fn test_zoom_bias_and_pixels_are_tunable() {
        let unbiased = GridConfig {
            zoom_bias: 0,
            cell_size_px: 256,
        };
        let biased = GridConfig::default();
        assert!((unbiased.cell_size(10) - 4.0 * biased.cell_size(10)).abs() < 1e-6);

        let small = GridConfig {
            zoom_bias: 2,
            cell_size_px: 64,
        };
        assert!((biased.cell_size(10) - 4.0 * small.cell_size(10)).abs() < 1e-6);
    }

    #[test]
    fn test_counts_partition_viewport() {
        let points = scatter(500);
        let viewport = GeoBounds::new(54.9, 55.1, 82.8, 83.1);
        let bounds = PlanarBounds::from_geo(&viewport);
        let inside = points
            .iter()
            .filter(|p| bounds.contains(to_planar(p.latitude, p.longitude)))
            .count() as u64;
        assert!(inside > 0 && inside < 500);

        for zoom in [1, 5, 10, 14, 18] {
            let clusters = aggregate(&points, &viewport, zoom, &GridConfig::default());
            assert_eq!(total(&clusters), inside, "zoom {zoom}");
        }
    }

    #[test]
    fn test_same_input_same_output() {
        let points = scatter(300);
        let first = aggregate(&points, &WIDE, 12, &GridConfig::default());
        let second = aggregate(&points, &WIDE, 12, &GridConfig::default());
        assert_eq!(first, second);

        let mut reversed = points.clone();
        reversed.reverse();
        let third = aggregate(&reversed, &WIDE, 12, &GridConfig::default());
        let ids = |c: &[ClusterSummary]| c.iter().map(|s| (s.cluster_id.clone(), s.point_count)).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&third));
    }

    #[test]
    fn test_cluster_count_non_decreasing_in_zoom() {
        let points = scatter(400);
        let mut previous = 0;
        for zoom in 0..=80 {
            let count = aggregate(&points, &WIDE, zoom, &GridConfig::default()).len();
            assert!(count >= previous, "zoom {zoom}: {count} < {previous}");
            previous = count;
        }
        assert_eq!(previous, 400);
    }

    #[test]
    fn test_two_nearby_points_share_a_cluster() {
        let config = GridConfig::default();
        let coarse = config.cell_size(2);
        let fine = config.cell_size(10);
        // Middle of a zoom 10 cell that sits inside a zoom 2 cell.
        let x = 2.0 * coarse + fine / 2.0;
        let y = coarse + fine / 2.0;
        let points = vec![
            at_planar(1, x, y, 3_000_000.0),
            at_planar(2, x + 3.0, y + 4.0, 5_000_000.0),
        ];

        for zoom in [10, 2] {
            let clusters = aggregate(&points, &WIDE, zoom, &config);
            assert_eq!(clusters.len(), 1, "zoom {zoom}");
            let c = &clusters[0];
            assert_eq!(c.point_count, 2);
            assert_eq!(c.min_price, 3_000_000.0);
            assert_eq!(c.max_price, 5_000_000.0);
            assert_eq!(c.avg_price, 4_000_000.0);
        }
    }

    #[test]
    fn test_centroid_is_planar_mean() {
        let size = GridConfig::default().cell_size(8);
        let x = 100.0 * size + 10.0;
        let y = 40.0 * size + 10.0;
        let points = vec![
            at_planar(1, x, y, 1.0),
            at_planar(2, x + 100.0, y + 300.0, 1.0),
        ];

        let clusters = aggregate(&points, &WIDE, 8, &GridConfig::default());
        assert_eq!(clusters.len(), 1);
        let (lat, lng) = to_geographic(PlanarPoint {
            x: x + 50.0,
            y: y + 150.0,
        });
        assert!((clusters[0].center_lat - lat).abs() < 1e-9);
        assert!((clusters[0].center_lng - lng).abs() < 1e-9);
        assert_eq!(
            clusters[0].cluster_id,
            format!("POINT({} {})", 100.0 * size, 40.0 * size)
        );
    }

    #[test]
    fn test_output_ordered_by_cell() {
        let clusters = aggregate(&scatter(200), &WIDE, 16, &GridConfig::default());
        let size = GridConfig::default().cell_size(16);
        let cells: Vec<(i64, i64)> = clusters
            .iter()
            .map(|c| {
                let planar = to_planar(c.center_lat, c.center_lng);
                cell_of(planar, size)
            })
            .collect();
        let mut sorted = cells.clone();
        sorted.sort_unstable();
        assert_eq!(cells, sorted);
    }

    #[test]
    fn test_inverted_viewport_is_empty() {
        let points = scatter(50);
        let inverted = GeoBounds::new(55.1, 54.9, 83.1, 82.8);
        assert!(aggregate(&points, &inverted, 10, &GridConfig::default()).is_empty());
    }

    #[test]
    fn test_no_points_no_clusters() {
        assert!(aggregate(&[], &WIDE, 10, &GridConfig::default()).is_empty());
    }
}
