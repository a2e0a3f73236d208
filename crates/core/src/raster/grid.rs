//! Main Raster type

use crate::error::{Error, Result};
use crate::geometry::BBox;
use crate::raster::{GeoTransform, RasterElement};
use ndarray::Array2;

/// A georeferenced 2D raster grid stored row-major as `(row, col)`.
///
/// ```ignore
/// use verdant_core::Raster;
///
/// let mut red: Raster<f64> = Raster::new(100, 100);
/// red.set(10, 20, 0.12)?;
/// let value = red.get(10, 20)?;
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    data: Array2<T>,
    transform: GeoTransform,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            nodata: None,
        }
    }

    /// Same transform, different data
    pub fn with_data<U: RasterElement>(&self, data: Array2<U>) -> Result<Raster<U>> {
        if data.dim() != self.shape() {
            let (er, ec) = self.shape();
            let (ar, ac) = data.dim();
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        Ok(Raster {
            data,
            transform: self.transform,
            nodata: None,
        })
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let (rows, cols) = self.shape();
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds { row, col, rows, cols }),
        }
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Geographic bounds as a [`BBox`]
    pub fn bbox(&self) -> BBox {
        let (min_x, min_y, max_x, max_y) = self.transform.bounds(self.cols(), self.rows());
        BBox::new(min_x, min_y, max_x, max_y)
    }

    /// Pixel center in geographic coordinates
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Valid cells as `f64`, with their `(row, col)`.
    pub fn valid_cells(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        self.data
            .indexed_iter()
            .filter(|(_, v)| !self.is_nodata(**v))
            .filter_map(|(idx, v)| (*v).to_f64().map(|f| (idx, f)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_and_bounds_checks() {
        let mut raster: Raster<f64> = Raster::new(4, 3);
        raster.set(2, 1, 0.12).unwrap();
        assert_eq!(raster.get(2, 1).unwrap(), 0.12);
        assert!(raster.get(4, 0).is_err());
        assert!(raster.set(0, 3, 1.0).is_err());
    }

    #[test]
    fn from_vec_checks_length() {
        assert!(Raster::<f64>::from_vec(vec![0.0; 5], 2, 3).is_err());
        assert!(Raster::<f64>::from_vec(vec![0.0; 6], 2, 3).is_ok());
    }

    #[test]
    fn valid_cells_skip_nodata() {
        let mut raster = Raster::from_vec(vec![1.0, 2.0, f64::NAN, 3.0], 2, 2).unwrap();
        raster.set_nodata(Some(f64::NAN));
        let cells: Vec<_> = raster.valid_cells().collect();
        assert_eq!(cells, vec![((0, 0), 1.0), ((0, 1), 2.0), ((1, 1), 3.0)]);
    }

    #[test]
    fn with_data_rejects_other_shapes() {
        let raster: Raster<f64> = Raster::new(2, 2);
        assert!(raster.with_data(ndarray::Array2::<f64>::zeros((3, 2))).is_err());
    }
}
