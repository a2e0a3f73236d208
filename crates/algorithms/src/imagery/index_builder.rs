//! Formula-based spectral indices
//!
//! Evaluates an [`IndexDefinition`] pixel by pixel over a scene's bands.
//! The definition's aliases (`NIR`, `RED`, ...) are resolved to collection
//! band names (`B8`, `B4`, ...) and looked up in the supplied band map.

use std::collections::HashMap;

use ndarray::Array2;
use verdant_core::raster::Raster;
use verdant_core::{Error, IndexDefinition, Result};

/// Compute the index band for one scene.
///
/// # Arguments
/// * `index` - Formula and alias bindings
/// * `bands` - Collection band name → raster. All referenced rasters must
///   have the same dimensions.
///
/// # Errors
/// - A bound band is missing from `bands`
/// - Raster dimensions don't match
pub fn evaluate_index(
    index: &IndexDefinition,
    bands: &HashMap<String, Raster<f64>>,
) -> Result<Raster<f64>> {
    let expr = index.expr();

    // alias -> raster, for the aliases the formula actually uses
    let mut inputs: Vec<(&str, &Raster<f64>)> = Vec::new();
    for alias in expr.band_names() {
        let band = index.band_for(alias).ok_or_else(|| Error::UnknownBand {
            name: alias.to_string(),
            available: index
                .bindings()
                .map(|(a, b)| format!("{}={}", a, b))
                .collect::<Vec<_>>()
                .join(", "),
        })?;
        let raster = bands.get(band).ok_or_else(|| Error::UnknownBand {
            name: band.to_string(),
            available: bands.keys().cloned().collect::<Vec<_>>().join(", "),
        })?;
        inputs.push((alias, raster));
    }

    let Some(&(_, first)) = inputs.first() else {
        return Err(Error::InvalidFormula {
            formula: index.formula().to_string(),
            reason: "formula references no bands".into(),
        });
    };
    let (rows, cols) = first.shape();
    for (_, raster) in &inputs {
        let (r, c) = raster.shape();
        if r != rows || c != cols {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: r,
                ac: c,
            });
        }
    }

    let mut data = Array2::from_elem((rows, cols), f64::NAN);
    let mut values: HashMap<&str, f64> = HashMap::with_capacity(inputs.len());

    for ((row, col), out) in data.indexed_iter_mut() {
        values.clear();
        let mut valid = true;
        for (alias, raster) in &inputs {
            let v = raster.data()[(row, col)];
            if raster.is_nodata(v) {
                valid = false;
                break;
            }
            values.insert(*alias, v);
        }
        if valid {
            *out = expr.eval(&values);
        }
    }

    let mut output = first.with_data(data)?;
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imagery::ndvi;
    use approx::assert_relative_eq;

    fn bands(pairs: &[(&str, f64)]) -> HashMap<String, Raster<f64>> {
        pairs
            .iter()
            .map(|(name, v)| (name.to_string(), Raster::filled(3, 3, *v)))
            .collect()
    }

    #[test]
    fn builtin_ndvi_matches_normalized_difference() {
        let b = bands(&[("B8", 0.8), ("B4", 0.2)]);
        let by_formula = evaluate_index(&IndexDefinition::ndvi("B8", "B4"), &b).unwrap();
        let direct = ndvi(&b["B8"], &b["B4"]).unwrap();
        assert_relative_eq!(by_formula.get(1, 1).unwrap(), direct.get(1, 1).unwrap());
        assert_relative_eq!(by_formula.get(1, 1).unwrap(), 0.6, epsilon = 1e-12);
    }

    #[test]
    fn custom_formula_with_constant() {
        let index = IndexDefinition::new(
            "SAVI",
            "1.5 * (NIR - RED) / (NIR + RED + 0.5)",
            &[("NIR", "B8"), ("RED", "B4")],
        )
        .unwrap();
        let out = evaluate_index(&index, &bands(&[("B8", 0.5), ("B4", 0.1)])).unwrap();
        assert_relative_eq!(out.get(0, 0).unwrap(), 1.5 * 0.4 / 1.1, epsilon = 1e-12);
    }

    #[test]
    fn missing_scene_band_is_an_error() {
        let err = evaluate_index(&IndexDefinition::ndvi("B8", "B4"), &bands(&[("B8", 0.5)]))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownBand { ref name, .. } if name == "B4"));
    }

    #[test]
    fn mismatched_band_sizes_are_an_error() {
        let mut b = bands(&[("B8", 0.5)]);
        b.insert("B4".into(), Raster::filled(2, 3, 0.1));
        assert!(evaluate_index(&IndexDefinition::ndvi("B8", "B4"), &b).is_err());
    }

    #[test]
    fn nodata_in_any_band_leaves_pixel_undefined() {
        let mut b = bands(&[("B8", 0.5), ("B4", 0.1)]);
        if let Some(red) = b.get_mut("B4") {
            red.set(0, 0, f64::NAN).unwrap();
        }
        let out = evaluate_index(&IndexDefinition::ndvi("B8", "B4"), &b).unwrap();
        assert!(out.get(0, 0).unwrap().is_nan());
        assert!(!out.get(0, 1).unwrap().is_nan());
    }
}
