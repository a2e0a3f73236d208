//! # Verdant Core
//!
//! Core types shared by the Verdant crates.
//!
//! This crate provides:
//! - `AreaOfInterest`, `TimeRange`, `SceneFilter`: the query a sample source answers
//! - `BandExpr` / `IndexDefinition`: spectral index formulas over named bands
//! - `Raster<T>`: a small georeferenced grid used for local band math
//! - `IndexSeries`: the chronologically ordered output of a run
//! - `SampleSource`: the seam between the pipeline and whoever computes the samples

pub mod error;
pub mod geometry;
pub mod index;
pub mod query;
pub mod raster;
pub mod series;
pub mod source;

pub use error::{Error, Result};
pub use geometry::{AreaOfInterest, BBox, LatLon};
pub use index::{BandExpr, IndexDefinition};
pub use query::{SceneFilter, TimeRange};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use series::{IndexSample, IndexSeries, RawSample};
pub use source::{collect_series, ReductionRequest, SampleSource};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::geometry::{AreaOfInterest, LatLon};
    pub use crate::index::IndexDefinition;
    pub use crate::query::{SceneFilter, TimeRange};
    pub use crate::series::{IndexSample, IndexSeries, RawSample};
    pub use crate::source::{ReductionRequest, SampleSource};
}
