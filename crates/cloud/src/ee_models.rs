//! Serde models for the `value:compute` endpoint.
//!
//! Covers the subset the sample pipeline needs: the request envelope, a
//! feature collection result, and the Google API error body.

use serde::{Deserialize, Serialize};

use crate::expression::Expression;

// ---------------------------------------------------------------------------
// Request / response envelopes
// ---------------------------------------------------------------------------

/// Body for `POST projects/{project}/value:compute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeValueRequest {
    pub expression: Expression,
}

/// Successful `value:compute` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeValueResponse {
    pub result: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Feature collection
// ---------------------------------------------------------------------------

/// GeoJSON-like feature collection as returned by the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// A feature; geometry is `null` for the reductions built here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub geometry: Option<serde_json::Value>,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// `{"error": {...}}` body of a failed Google API call.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}
