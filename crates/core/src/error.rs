//! Error types for Verdant

use thiserror::Error;

/// Main error type for Verdant core operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Invalid formula '{formula}': {reason}")]
    InvalidFormula { formula: String, reason: String },

    #[error("Band '{name}' is not bound (available: {available})")]
    UnknownBand { name: String, available: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Verdant core operations
pub type Result<T> = std::result::Result<T, Error>;
