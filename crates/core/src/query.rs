//! Scene query parameters: time range and the full scene filter.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::geometry::AreaOfInterest;

/// Sentinel-2 surface reflectance, harmonized processing baseline.
pub const DEFAULT_COLLECTION: &str = "COPERNICUS/S2_SR_HARMONIZED";

/// Scene-level cloud estimate published with Sentinel-2 products.
pub const DEFAULT_CLOUD_PROPERTY: &str = "CLOUDY_PIXEL_PERCENTAGE";

/// Inclusive calendar date range.
///
/// Start after end is not rejected; such a range matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TimeRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day included in the range.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// First day after the range, for APIs that take a half-open interval.
    pub fn end_exclusive(&self) -> NaiveDate {
        self.end.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX)
    }

    /// Whether an instant falls on one of the range's days (UTC).
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        let day = instant.date_naive();
        day >= self.start && day <= self.end
    }
}

/// Everything needed to select scenes from a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneFilter {
    pub aoi: AreaOfInterest,
    pub time_range: TimeRange,
    /// Scenes pass when their cloud cover is strictly below this percentage.
    pub max_cloud_cover: f64,
    /// Platform collection id.
    pub collection: String,
    /// Scene property holding the cloud-cover percentage.
    pub cloud_property: String,
}

impl SceneFilter {
    /// Filter over the default Sentinel-2 collection.
    pub fn new(aoi: AreaOfInterest, time_range: TimeRange, max_cloud_cover: f64) -> Self {
        Self {
            aoi,
            time_range,
            max_cloud_cover,
            collection: DEFAULT_COLLECTION.to_string(),
            cloud_property: DEFAULT_CLOUD_PROPERTY.to_string(),
        }
    }

    /// Use a different collection id.
    pub fn collection(mut self, id: &str) -> Self {
        self.collection = id.to_string();
        self
    }

    /// Use a different cloud-cover property name.
    pub fn cloud_property(mut self, name: &str) -> Self {
        self.cloud_property = name.to_string();
        self
    }

    /// Whether a scene with the given cloud cover passes the threshold.
    pub fn accepts_cloud_cover(&self, cloud_cover: f64) -> bool {
        cloud_cover < self.max_cloud_cover
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LatLon;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn end_exclusive_is_next_day() {
        let range = TimeRange::new(date(2020, 1, 1), date(2023, 12, 31));
        assert_eq!(range.end_exclusive(), date(2024, 1, 1));
    }

    #[test]
    fn contains_is_inclusive_on_both_ends() {
        let range = TimeRange::new(date(2020, 1, 1), date(2020, 1, 31));
        let first = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let last = Utc.with_ymd_and_hms(2020, 1, 31, 23, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2020, 2, 1, 0, 0, 0).unwrap();
        assert!(range.contains(&first));
        assert!(range.contains(&last));
        assert!(!range.contains(&after));
    }

    #[test]
    fn cloud_threshold_is_strict() {
        let aoi = AreaOfInterest::new(LatLon::new(0.0, 0.0), 100.0);
        let range = TimeRange::new(date(2020, 1, 1), date(2020, 12, 31));
        let filter = SceneFilter::new(aoi, range, 10.0);
        assert!(filter.accepts_cloud_cover(9.99));
        assert!(!filter.accepts_cloud_cover(10.0));
        assert_eq!(filter.collection, DEFAULT_COLLECTION);
    }
}
