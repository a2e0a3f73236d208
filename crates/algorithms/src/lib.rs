//! # Verdant Algorithms
//!
//! Local counterparts of the remote platform's image operations.
//!
//! - **imagery**: normalized difference / NDVI and formula-based indices
//! - **statistics**: mean of a band over a circular AOI
//! - **catalog**: an in-memory scene collection implementing `SampleSource`

pub mod catalog;
pub mod imagery;
pub mod statistics;

pub use catalog::{Scene, SceneCatalog};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::catalog::{Scene, SceneCatalog};
    pub use crate::imagery::{evaluate_index, ndvi, normalized_difference};
    pub use crate::statistics::{region_mean, RegionMean};
    pub use verdant_core::prelude::*;
}
