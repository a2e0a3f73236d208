//! Async client for the Earth Engine REST API.
//!
//! Only `projects/{project}/value:compute` is used: the whole per-scene
//! reduction is described as one expression and evaluated server-side.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use tracing::debug;
use verdant_core::{RawSample, ReductionRequest};

use crate::auth::CloudAuth;
use crate::ee_models::{ApiErrorBody, ComputeValueRequest, ComputeValueResponse};
use crate::error::{CloudError, Result};
use crate::expression::Expression;
use crate::lowering::{parse_samples, series_expression};

/// Public REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://earthengine.googleapis.com/v1";

/// Project used when none is configured.
pub const DEFAULT_PROJECT: &str = "earthengine-legacy";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for [`EarthEngineClient`].
#[derive(Debug, Clone)]
pub struct EarthEngineOptions {
    /// API root, without trailing slash (default [`DEFAULT_BASE_URL`]).
    pub base_url: String,
    /// Cloud project billed for the computation.
    pub project: String,
    /// Per-request timeout. `None` waits for the platform indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for EarthEngineOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            project: DEFAULT_PROJECT.to_string(),
            request_timeout: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Async client for `value:compute`.
pub struct EarthEngineClient {
    client: reqwest::Client,
    options: EarthEngineOptions,
    auth: Box<dyn CloudAuth>,
}

impl EarthEngineClient {
    /// Create a new client.
    pub fn new(options: EarthEngineOptions, auth: Box<dyn CloudAuth>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CloudError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            options,
            auth,
        })
    }

    pub fn options(&self) -> &EarthEngineOptions {
        &self.options
    }

    /// Full URL of the compute endpoint for the configured project.
    pub fn compute_url(&self) -> String {
        format!(
            "{}/projects/{}/value:compute",
            self.options.base_url.trim_end_matches('/'),
            self.options.project
        )
    }

    /// Evaluate an expression and return the raw `result` value.
    pub async fn compute_value(&self, expression: Expression) -> Result<serde_json::Value> {
        let url = self.compute_url();
        let body = ComputeValueRequest { expression };
        debug!(
            "POST {} ({} expression nodes)",
            url,
            body.expression.values.len()
        );

        let mut signed = Vec::new();
        self.auth.sign_request(&url, "POST", &mut signed)?;
        let headers = to_header_map(&signed)?;

        let resp = self
            .client
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| CloudError::Network(format!("value:compute request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| CloudError::Network(format!("reading response body: {e}")))?;

        if !status.is_success() {
            return Err(api_error(status, &text));
        }

        let parsed: ComputeValueResponse = serde_json::from_str(&text).map_err(|e| {
            CloudError::InvalidResponse(format!("parsing value:compute response: {e}"))
        })?;
        Ok(parsed.result)
    }

    /// Run a reduction request and return one raw sample per matching scene.
    pub async fn reduce(&self, request: &ReductionRequest) -> Result<Vec<RawSample>> {
        let expression = series_expression(request);
        let result = self.compute_value(expression).await?;
        parse_samples(result, request.index.name())
    }
}

fn to_header_map(pairs: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| CloudError::Auth(format!("invalid header name '{}': {e}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| CloudError::Auth(format!("invalid header value: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Map a non-2xx response to the error taxonomy.
pub(crate) fn api_error(status: StatusCode, body: &str) -> CloudError {
    let (message, api_status) = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => (parsed.error.message, parsed.error.status),
        Err(_) => (body.chars().take(500).collect::<String>(), String::new()),
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            CloudError::Auth(format!("HTTP {}: {}", status.as_u16(), message))
        }
        StatusCode::TOO_MANY_REQUESTS => CloudError::Quota(message),
        _ => CloudError::Api {
            code: status.as_u16(),
            status: if api_status.is_empty() {
                status.canonical_reason().unwrap_or("").to_string()
            } else {
                api_status
            },
            message,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::NoAuth;

    fn client(options: EarthEngineOptions) -> EarthEngineClient {
        EarthEngineClient::new(options, Box::new(NoAuth)).unwrap()
    }

    #[test]
    fn compute_url_uses_project() {
        let c = client(EarthEngineOptions::default());
        assert_eq!(
            c.compute_url(),
            "https://earthengine.googleapis.com/v1/projects/earthengine-legacy/value:compute"
        );

        let c = client(EarthEngineOptions {
            base_url: "http://localhost:8080/v1/".into(),
            project: "my-project".into(),
            ..Default::default()
        });
        assert_eq!(
            c.compute_url(),
            "http://localhost:8080/v1/projects/my-project/value:compute"
        );
    }

    #[test]
    fn auth_failures_map_to_auth() {
        let body = r#"{"error":{"code":401,"message":"Request had invalid authentication credentials.","status":"UNAUTHENTICATED"}}"#;
        assert!(matches!(
            api_error(StatusCode::UNAUTHORIZED, body),
            CloudError::Auth(m) if m.contains("invalid authentication")
        ));
        assert!(matches!(
            api_error(StatusCode::FORBIDDEN, "denied"),
            CloudError::Auth(_)
        ));
    }

    #[test]
    fn rate_limit_maps_to_quota() {
        let body = r#"{"error":{"code":429,"message":"Too many concurrent aggregations.","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(
            api_error(StatusCode::TOO_MANY_REQUESTS, body),
            CloudError::Quota(m) if m.contains("aggregations")
        ));
    }

    #[test]
    fn bad_request_keeps_platform_status() {
        let body = r#"{"error":{"code":400,"message":"Collection.filter: Unknown property","status":"INVALID_ARGUMENT"}}"#;
        match api_error(StatusCode::BAD_REQUEST, body) {
            CloudError::Api {
                code,
                status,
                message,
            } => {
                assert_eq!(code, 400);
                assert_eq!(status, "INVALID_ARGUMENT");
                assert!(message.starts_with("Collection.filter"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn non_json_error_body_is_truncated() {
        let body = "x".repeat(2000);
        match api_error(StatusCode::BAD_GATEWAY, &body) {
            CloudError::Api {
                code,
                status,
                message,
            } => {
                assert_eq!(code, 502);
                assert_eq!(status, "Bad Gateway");
                assert_eq!(message.len(), 500);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn headers_from_auth_pairs() {
        let map = to_header_map(&[("Authorization".into(), "Bearer abc".into())]).unwrap();
        assert_eq!(map["authorization"], "Bearer abc");
    }
}
