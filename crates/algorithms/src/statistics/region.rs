//! Mean of a band over a circular area of interest
//!
//! A pixel belongs to the region when its center lies inside the AOI circle.
//! Rasters must be georeferenced in degrees (x = lon, y = lat).

use verdant_core::raster::Raster;
use verdant_core::AreaOfInterest;

/// Result of reducing one band over the AOI
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionMean {
    /// `None` when no valid pixel falls inside the region.
    pub mean: Option<f64>,
    /// Valid pixels that contributed to the mean.
    pub valid_count: usize,
    /// Pixels whose center lies in the region, valid or not.
    pub region_count: usize,
}

/// Average the valid pixels of `raster` whose centers fall inside `aoi`.
pub fn region_mean(raster: &Raster<f64>, aoi: &AreaOfInterest) -> RegionMean {
    let (rows, cols) = raster.shape();
    let mut sum = 0.0;
    let mut valid_count = 0usize;
    let mut region_count = 0usize;

    for row in 0..rows {
        for col in 0..cols {
            let (lon, lat) = raster.pixel_to_geo(col, row);
            if !aoi.contains(lon, lat) {
                continue;
            }
            region_count += 1;

            let v = raster.data()[(row, col)];
            if raster.is_nodata(v) || !v.is_finite() {
                continue;
            }
            sum += v;
            valid_count += 1;
        }
    }

    RegionMean {
        mean: (valid_count > 0).then(|| sum / valid_count as f64),
        valid_count,
        region_count,
    }
}
