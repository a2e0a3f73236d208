//! The seam between the pipeline and whatever computes per-scene samples.
//!
//! A [`SampleSource`] answers one [`ReductionRequest`]: select the scenes that
//! match the filter, derive the index band on each, average it over the AOI
//! and report `(acquisition time, mean)` per scene. [`collect_series`] runs
//! that request and assembles the result.

use tracing::info;

use crate::index::IndexDefinition;
use crate::query::SceneFilter;
use crate::series::{IndexSeries, RawSample};

/// Native ground sampling distance of the Sentinel-2 red and NIR bands.
pub const DEFAULT_SCALE_M: f64 = 10.0;

/// Everything a source needs to produce samples.
#[derive(Debug, Clone, PartialEq)]
pub struct ReductionRequest {
    pub filter: SceneFilter,
    pub index: IndexDefinition,
    /// Ground sampling distance for the spatial mean, in meters.
    pub scale_m: f64,
}

impl ReductionRequest {
    pub fn new(filter: SceneFilter, index: IndexDefinition) -> Self {
        Self {
            filter,
            index,
            scale_m: DEFAULT_SCALE_M,
        }
    }

    pub fn scale(mut self, scale_m: f64) -> Self {
        self.scale_m = scale_m;
        self
    }
}

/// Produces one raw sample per matching scene, in any order.
pub trait SampleSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Human-readable label for logs.
    fn describe(&self) -> String;

    /// Reduce every matching scene to its mean index value.
    fn reduce(&self, request: &ReductionRequest) -> Result<Vec<RawSample>, Self::Error>;
}

impl<S: SampleSource + ?Sized> SampleSource for &S {
    type Error = S::Error;

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn reduce(&self, request: &ReductionRequest) -> Result<Vec<RawSample>, Self::Error> {
        (**self).reduce(request)
    }
}

/// Run the request against a source and assemble the ordered series.
pub fn collect_series<S: SampleSource>(
    source: &S,
    request: &ReductionRequest,
) -> Result<IndexSeries, S::Error> {
    info!(
        "Requesting {} over {} ({} .. {}, cloud < {}%) from {}",
        request.index.name(),
        request.filter.collection,
        request.filter.time_range.start(),
        request.filter.time_range.end(),
        request.filter.max_cloud_cover,
        source.describe()
    );

    let raw = source.reduce(request)?;
    let scene_count = raw.len();
    let series = IndexSeries::assemble(request.index.name(), raw);

    info!(
        "{} scenes reduced, {} samples kept",
        scene_count,
        series.len()
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{AreaOfInterest, LatLon};
    use crate::query::TimeRange;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::convert::Infallible;

    struct Fixed(Vec<RawSample>);

    impl SampleSource for Fixed {
        type Error = Infallible;

        fn describe(&self) -> String {
            "fixed".into()
        }

        fn reduce(&self, _request: &ReductionRequest) -> Result<Vec<RawSample>, Infallible> {
            Ok(self.0.clone())
        }
    }

    fn request() -> ReductionRequest {
        let aoi = AreaOfInterest::new(LatLon::new(-31.7668, -52.3448), 5000.0);
        let range = TimeRange::new(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        );
        ReductionRequest::new(SceneFilter::new(aoi, range, 10.0), IndexDefinition::ndvi("B8", "B4"))
    }

    #[test]
    fn default_scale_is_ten_meters() {
        assert_eq!(request().scale_m, 10.0);
        assert_eq!(request().scale(20.0).scale_m, 20.0);
    }

    #[test]
    fn collects_through_a_reference() {
        let t1 = Utc.with_ymd_and_hms(2020, 2, 1, 13, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2020, 3, 1, 13, 0, 0).unwrap();
        let t3 = Utc.with_ymd_and_hms(2020, 4, 1, 13, 0, 0).unwrap();
        let source = Fixed(vec![
            RawSample::new(t3, Some(0.5)),
            RawSample::new(t1, None),
            RawSample::new(t2, Some(0.2)),
        ]);

        let series = collect_series(&&source, &request()).unwrap();
        assert_eq!(series.name(), "NDVI");
        assert_eq!(series.len(), 2);
        assert_eq!(series.samples()[0].timestamp, t2);
        assert_eq!(series.samples()[1].timestamp, t3);
    }
}
