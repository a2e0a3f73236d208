//! Imagery algorithms
//!
//! - Normalized difference and NDVI over two band rasters
//! - Formula-based indices from an `IndexDefinition`

mod index_builder;
mod indices;

pub use index_builder::evaluate_index;
pub use indices::{ndvi, normalized_difference};
