//! Error types for chart output.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChartError>;
