//! Geographic primitives: coordinates, bounding boxes and the circular AOI.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance_m(&self, other: &LatLon) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.lon - self.lon).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// A geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Check if two bboxes intersect (touching edges count).
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }
}

/// A circular area of interest: a center point buffered by a radius in meters.
///
/// Immutable once constructed. Coordinates are not range-checked; a bogus
/// center simply matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaOfInterest {
    center: LatLon,
    radius_m: f64,
}

impl AreaOfInterest {
    pub fn new(center: LatLon, radius_m: f64) -> Self {
        Self { center, radius_m }
    }

    pub fn center(&self) -> LatLon {
        self.center
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Whether a lon/lat point falls inside the buffered circle.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.center.distance_m(&LatLon::new(lat, lon)) <= self.radius_m
    }

    /// Bounding box of the circle in degrees.
    ///
    /// Longitude extent widens with latitude; near the poles it is clamped
    /// to the full [-180, 180] range.
    pub fn bbox(&self) -> BBox {
        let d_lat = (self.radius_m / EARTH_RADIUS_M).to_degrees();
        let cos_lat = self.center.lat.to_radians().cos();
        let d_lon = if cos_lat.abs() < 1e-12 {
            180.0
        } else {
            (d_lat / cos_lat).min(180.0)
        };

        BBox::new(
            self.center.lon - d_lon,
            self.center.lat - d_lat,
            self.center.lon + d_lon,
            self.center.lat + d_lat,
        )
    }
}
