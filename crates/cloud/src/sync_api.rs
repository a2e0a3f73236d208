//! Blocking (synchronous) API for native platforms.
//!
//! Wraps the async [`EarthEngineClient`] with a Tokio runtime so callers
//! don't need to manage their own async runtime.

#[cfg(feature = "native")]
mod inner {
    use verdant_core::{RawSample, ReductionRequest, SampleSource};

    use crate::auth::CloudAuth;
    use crate::ee_client::{EarthEngineClient, EarthEngineOptions};
    use crate::error::{CloudError, Result};
    use crate::expression::Expression;

    /// Earth Engine as a [`SampleSource`].
    ///
    /// Uses an internal single-threaded Tokio runtime. Each `reduce` call is
    /// one `value:compute` request; nothing is retried.
    pub struct EarthEngineSource {
        rt: tokio::runtime::Runtime,
        inner: EarthEngineClient,
    }

    impl EarthEngineSource {
        /// Create a blocking source.
        pub fn new(options: EarthEngineOptions, auth: Box<dyn CloudAuth>) -> Result<Self> {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| CloudError::Network(e.to_string()))?;

            let inner = EarthEngineClient::new(options, auth)?;
            Ok(Self { rt, inner })
        }

        /// The wrapped async client.
        pub fn client(&self) -> &EarthEngineClient {
            &self.inner
        }

        /// Evaluate an arbitrary expression (blocking).
        pub fn compute_value(&self, expression: Expression) -> Result<serde_json::Value> {
            self.rt.block_on(self.inner.compute_value(expression))
        }
    }

    impl SampleSource for EarthEngineSource {
        type Error = CloudError;

        fn describe(&self) -> String {
            format!("Earth Engine ({})", self.inner.options().project)
        }

        fn reduce(&self, request: &ReductionRequest) -> Result<Vec<RawSample>> {
            self.rt.block_on(self.inner.reduce(request))
        }
    }
}

#[cfg(feature = "native")]
pub use inner::*;
