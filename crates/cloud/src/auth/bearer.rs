//! OAuth2 bearer-token authentication.
//!
//! Earth Engine accepts any Google OAuth2 access token with the
//! `earthengine` (or `cloud-platform`) scope. The token is obtained out of
//! band, either passed in directly, read from `EARTHENGINE_TOKEN`, or
//! printed by the Google Cloud SDK:
//!
//! ```text
//! gcloud auth print-access-token
//! ```

use std::process::Command;

use crate::auth::CloudAuth;
use crate::error::{CloudError, Result};

/// Environment variable holding an access token.
pub const TOKEN_ENV: &str = "EARTHENGINE_TOKEN";

/// Static bearer token.
#[derive(Clone)]
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    /// Use an explicit token.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(CloudError::Auth("empty access token".into()));
        }
        Ok(Self { token })
    }

    /// Read the token from `EARTHENGINE_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TOKEN_ENV)
            .map_err(|_| CloudError::Auth(format!("{} not set", TOKEN_ENV)))?;
        Self::new(token)
    }

    /// Ask the Google Cloud SDK for a token.
    pub fn from_gcloud() -> Result<Self> {
        let output = Command::new("gcloud")
            .args(["auth", "print-access-token"])
            .output()
            .map_err(|e| CloudError::Auth(format!("failed to run gcloud: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CloudError::Auth(format!(
                "gcloud auth print-access-token failed: {}",
                stderr.trim()
            )));
        }

        Self::new(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth").field("token", &"<redacted>").finish()
    }
}

impl CloudAuth for BearerAuth {
    fn sign_request(
        &self,
        _url: &str,
        _method: &str,
        headers: &mut Vec<(String, String)>,
    ) -> Result<()> {
        headers.push(("Authorization".to_string(), format!("Bearer {}", self.token)));
        Ok(())
    }
}
