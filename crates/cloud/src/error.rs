//! Error types for the Earth Engine client.

use thiserror::Error;

/// Errors produced while talking to the remote platform.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("authentication error: {0}")]
    Auth(String),

    #[error("quota exceeded: {0}")]
    Quota(String),

    /// The platform rejected the request (bad filter, unknown band, ...).
    #[error("Earth Engine returned HTTP {code} {status}: {message}")]
    Api {
        code: u16,
        status: String,
        message: String,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;
