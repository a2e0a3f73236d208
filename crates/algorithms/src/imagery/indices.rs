//! Two-band normalized difference indices

use ndarray::Array2;
use verdant_core::raster::Raster;
use verdant_core::{Error, Result};

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in [-1, 1] for non-negative inputs. Pixels where the sum is
/// zero, or where either band is nodata, are NaN.
///
/// # Arguments
/// * `band_a` - Numerator positive band
/// * `band_b` - Numerator negative band
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    check_dimensions(band_a, band_b)?;

    let (rows, cols) = band_a.shape();
    let mut data = Array2::from_elem((rows, cols), f64::NAN);

    for ((row, col), out) in data.indexed_iter_mut() {
        let a = band_a.data()[(row, col)];
        let b = band_b.data()[(row, col)];

        if band_a.is_nodata(a) || band_b.is_nodata(b) {
            continue;
        }

        let sum = a + b;
        if sum == 0.0 {
            continue;
        }

        *out = (a - b) / sum;
    }

    let mut output = band_a.with_data(data)?;
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// - Dense vegetation: 0.6 to 0.9
/// - Sparse vegetation: 0.2 to 0.5
/// - Bare soil: 0.1 to 0.2
/// - Water/clouds: -1.0 to 0.0
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

pub(crate) fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    let (er, ec) = a.shape();
    let (ar, ac) = b.shape();
    if er != ar || ec != ac {
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn band(values: &[f64]) -> Raster<f64> {
        Raster::from_vec(values.to_vec(), 1, values.len()).unwrap()
    }

    #[test]
    fn equal_bands_give_zero() {
        let out = ndvi(&band(&[0.3, 1200.0]), &band(&[0.3, 1200.0])).unwrap();
        assert_relative_eq!(out.get(0, 0).unwrap(), 0.0);
        assert_relative_eq!(out.get(0, 1).unwrap(), 0.0);
    }

    #[test]
    fn sign_follows_nir_minus_red() {
        let out = ndvi(&band(&[0.8, 0.1]), &band(&[0.2, 0.5])).unwrap();
        assert!(out.get(0, 0).unwrap() > 0.0);
        assert!(out.get(0, 1).unwrap() < 0.0);
        assert_relative_eq!(out.get(0, 0).unwrap(), 0.6, epsilon = 1e-12);
    }

    #[test]
    fn bounded_for_non_negative_reflectance() {
        let nir: Vec<f64> = (0..50).map(|i| i as f64 * 137.0 % 10_000.0).collect();
        let red: Vec<f64> = (0..50).map(|i| (49 - i) as f64 * 211.0 % 10_000.0).collect();
        let out = ndvi(&band(&nir), &band(&red)).unwrap();
        for (_, v) in out.valid_cells() {
            assert!((-1.0..=1.0).contains(&v), "NDVI out of range: {}", v);
        }
        // Extremes: only one band reflects
        let out = ndvi(&band(&[1.0, 0.0]), &band(&[0.0, 1.0])).unwrap();
        assert_relative_eq!(out.get(0, 0).unwrap(), 1.0);
        assert_relative_eq!(out.get(0, 1).unwrap(), -1.0);
    }

    #[test]
    fn zero_sum_is_undefined() {
        let out = ndvi(&band(&[0.0]), &band(&[0.0])).unwrap();
        assert!(out.get(0, 0).unwrap().is_nan());
        assert_eq!(out.valid_cells().count(), 0);
    }

    #[test]
    fn tiny_reflectances_stay_defined() {
        let out = ndvi(&band(&[3e-12]), &band(&[1e-12])).unwrap();
        assert_relative_eq!(out.get(0, 0).unwrap(), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn nodata_propagates() {
        let mut nir = band(&[0.0, 0.5]);
        nir.set_nodata(Some(0.0));
        let out = ndvi(&nir, &band(&[0.2, 0.2])).unwrap();
        assert!(out.get(0, 0).unwrap().is_nan());
        assert!(!out.get(0, 1).unwrap().is_nan());
    }

    #[test]
    fn size_mismatch_is_an_error() {
        assert!(ndvi(&band(&[0.1, 0.2]), &band(&[0.1])).is_err());
    }
}
