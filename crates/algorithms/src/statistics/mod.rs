//! Spatial reductions over an area of interest

mod region;

pub use region::{region_mean, RegionMean};
