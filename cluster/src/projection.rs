//! Spherical Web Mercator (EPSG:3857) in metres.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude where the projected world becomes square.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Width of the projected world, about 40 075 km.
pub const WORLD_EXTENT_M: f64 = 2.0 * PI * EARTH_RADIUS_M;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
}

/// Latitudes beyond `MAX_LATITUDE` are clamped before projecting.
pub fn to_planar(latitude: f64, longitude: f64) -> PlanarPoint {
    let lat = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    PlanarPoint {
        x: EARTH_RADIUS_M * longitude.to_radians(),
        y: EARTH_RADIUS_M * (FRAC_PI_4 + lat / 2.0).tan().ln(),
    }
}

/// Inverse of `to_planar`, returning `(latitude, longitude)` in degrees.
pub fn to_geographic(point: PlanarPoint) -> (f64, f64) {
    let lng = (point.x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (point.y / EARTH_RADIUS_M).exp().atan() - FRAC_PI_2).to_degrees();
    (lat, lng)
}
