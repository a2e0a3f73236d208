//! Affine geotransformation for rasters

use serde::{Deserialize, Serialize};

/// North-up affine transform mapping pixel (col, row) to geographic (x, y).
///
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height
/// ```
///
/// `pixel_height` is negative for the usual top-down row order. Scene rasters
/// kept in memory are georeferenced in degrees (x = lon, y = lat).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Geographic coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Bounding box (min_x, min_y, max_x, max_y) for a raster of given dimensions
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let x0 = self.origin_x;
        let x1 = self.origin_x + width as f64 * self.pixel_width;
        let y0 = self.origin_y;
        let y1 = self.origin_y + height as f64 * self.pixel_height;
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pixel_center() {
        let gt = GeoTransform::new(-52.4, -31.7, 0.001, -0.001);
        let (x, y) = gt.pixel_to_geo(0, 0);
        assert_relative_eq!(x, -52.3995, epsilon = 1e-10);
        assert_relative_eq!(y, -31.7005, epsilon = 1e-10);
    }

    #[test]
    fn bounds_of_north_up_grid() {
        let gt = GeoTransform::new(0.0, 100.0, 1.0, -1.0);
        let (min_x, min_y, max_x, max_y) = gt.bounds(100, 50);
        assert_relative_eq!(min_x, 0.0);
        assert_relative_eq!(min_y, 50.0);
        assert_relative_eq!(max_x, 100.0);
        assert_relative_eq!(max_y, 100.0);
    }
}
