//! # Verdant Cloud
//!
//! Earth Engine REST client.
//!
//! The remote platform owns the scene collection: this crate only describes
//! the computation (filter, band math, reduction) as an Earth Engine
//! expression graph, posts it to `value:compute` and parses the resulting
//! feature collection into raw samples.
//!
//! ## Features
//!
//! - `native` (default): blocking API and the [`EarthEngineSource`] sample
//!   source, driven by a current-thread tokio runtime

pub mod auth;
pub mod ee_client;
pub mod ee_models;
pub mod error;
pub mod expression;
pub mod lowering;

pub mod sync_api;

pub use ee_client::{EarthEngineClient, EarthEngineOptions};
pub use error::{CloudError, Result};
pub use expression::{Expression, ValueNode};

#[cfg(feature = "native")]
pub use sync_api::EarthEngineSource;
