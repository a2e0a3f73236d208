//! Authentication for the Earth Engine REST API.
//!
//! Obtaining credentials is out of band; these types only attach them.

mod bearer;
mod none;

pub use bearer::BearerAuth;
pub use none::NoAuth;

use crate::error::Result;

/// Trait for signing outgoing requests.
///
/// Implementations add authentication headers before the request is sent.
pub trait CloudAuth: Send + Sync {
    /// Add auth headers for a request to `url`.
    fn sign_request(
        &self,
        url: &str,
        method: &str,
        headers: &mut Vec<(String, String)>,
    ) -> Result<()>;
}
