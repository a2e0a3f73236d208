//! In-memory scene collection
//!
//! [`SceneCatalog`] answers a [`ReductionRequest`] the way the remote platform
//! does, but over scenes held in memory: filter by collection, date, cloud
//! cover and footprint, derive the index band, then average it over the AOI.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;
use verdant_core::raster::Raster;
use verdant_core::{BBox, IndexDefinition, RawSample, ReductionRequest, Result, SampleSource};

use crate::imagery::evaluate_index;
use crate::statistics::region_mean;

/// One acquisition with its bands.
///
/// All bands share one grid, georeferenced in degrees.
#[derive(Debug, Clone)]
pub struct Scene {
    pub id: String,
    pub collection: String,
    pub acquired: DateTime<Utc>,
    /// Scene-level cloud cover, percent.
    pub cloud_cover: f64,
    pub bands: HashMap<String, Raster<f64>>,
}

impl Scene {
    pub fn new(id: &str, collection: &str, acquired: DateTime<Utc>, cloud_cover: f64) -> Self {
        Self {
            id: id.to_string(),
            collection: collection.to_string(),
            acquired,
            cloud_cover,
            bands: HashMap::new(),
        }
    }

    /// Attach a band.
    pub fn band(mut self, name: &str, raster: Raster<f64>) -> Self {
        self.bands.insert(name.to_string(), raster);
        self
    }

    /// Footprint of the band bound to the formula's first alias.
    ///
    /// `None` when the scene lacks that band.
    pub fn footprint(&self, index: &IndexDefinition) -> Option<BBox> {
        let alias = index.expr().band_names().into_iter().next()?;
        let band = index.band_for(alias)?;
        self.bands.get(band).map(|r| r.bbox())
    }
}

/// Scenes held in memory.
#[derive(Debug, Clone, Default)]
pub struct SceneCatalog {
    scenes: Vec<Scene>,
}

impl SceneCatalog {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self { scenes }
    }

    pub fn push(&mut self, scene: Scene) {
        self.scenes.push(scene);
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Scenes that pass the request's filter, in catalog order.
    pub fn matching<'a>(
        &'a self,
        request: &'a ReductionRequest,
    ) -> impl Iterator<Item = &'a Scene> + 'a {
        let filter = &request.filter;
        let aoi_bbox = filter.aoi.bbox();
        self.scenes.iter().filter(move |scene| {
            scene.collection == filter.collection
                && filter.time_range.contains(&scene.acquired)
                && filter.accepts_cloud_cover(scene.cloud_cover)
                && scene
                    .footprint(&request.index)
                    .map(|fp| fp.intersects(&aoi_bbox))
                    .unwrap_or(false)
        })
    }

    /// Reduce one scene to its mean index value over the AOI.
    pub fn reduce_scene(&self, scene: &Scene, request: &ReductionRequest) -> Result<RawSample> {
        let index = evaluate_index(&request.index, &scene.bands)?;
        let reduced = region_mean(&index, &request.filter.aoi);
        debug!(
            "{}: {} of {} AOI pixels valid, mean {:?}",
            scene.id, reduced.valid_count, reduced.region_count, reduced.mean
        );
        Ok(RawSample::new(scene.acquired, reduced.mean))
    }
}

impl SampleSource for SceneCatalog {
    type Error = verdant_core::Error;

    fn describe(&self) -> String {
        format!("in-memory catalog ({} scenes)", self.scenes.len())
    }

    /// Scenes are reduced at their native grid; `scale_m` is not resampled.
    fn reduce(&self, request: &ReductionRequest) -> Result<Vec<RawSample>> {
        self.matching(request)
            .map(|scene| self.reduce_scene(scene, request))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use verdant_core::{AreaOfInterest, GeoTransform, LatLon, SceneFilter, TimeRange};

    const S2: &str = verdant_core::query::DEFAULT_COLLECTION;

    fn band(value: f64) -> Raster<f64> {
        let mut r = Raster::filled(11, 11, value);
        r.set_transform(GeoTransform::new(-52.40, -31.71, 0.01, -0.01));
        r
    }

    fn scene(id: &str, day: u32, cloud: f64, nir: f64, red: f64) -> Scene {
        Scene::new(id, S2, Utc.with_ymd_and_hms(2021, 5, day, 13, 0, 0).unwrap(), cloud)
            .band("B8", band(nir))
            .band("B4", band(red))
    }

    fn request() -> ReductionRequest {
        let aoi = AreaOfInterest::new(LatLon::new(-31.7668, -52.3448), 5000.0);
        let range = TimeRange::new(
            NaiveDate::from_ymd_opt(2021, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2021, 5, 31).unwrap(),
        );
        ReductionRequest::new(SceneFilter::new(aoi, range, 10.0), IndexDefinition::ndvi("B8", "B4"))
    }

    #[test]
    fn filters_by_cloud_date_and_collection() {
        let mut late = scene("late", 1, 1.0, 0.5, 0.1);
        late.acquired = Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap();
        let other = Scene {
            collection: "LANDSAT/LC08/C02/T1_L2".into(),
            ..scene("landsat", 2, 1.0, 0.5, 0.1)
        };
        let catalog = SceneCatalog::new(vec![
            scene("clear", 3, 2.0, 0.5, 0.1),
            scene("cloudy", 4, 10.0, 0.5, 0.1),
            late,
            other,
        ]);
        let req = request();
        let ids: Vec<&str> = catalog.matching(&req).map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["clear"]);
    }

    #[test]
    fn footprint_outside_aoi_is_skipped() {
        let mut far = scene("far", 3, 1.0, 0.5, 0.1);
        for r in far.bands.values_mut() {
            r.set_transform(GeoTransform::new(10.0, 10.0, 0.01, -0.01));
        }
        let catalog = SceneCatalog::new(vec![far]);
        assert_eq!(catalog.reduce(&request()).unwrap(), Vec::new());
    }

    #[test]
    fn footprint_follows_the_formula_band() {
        let mut far = band(0.0);
        far.set_transform(GeoTransform::new(10.0, 10.0, 0.01, -0.01));

        // Unused band elsewhere: still matched on B8
        let near = scene("near", 3, 1.0, 0.5, 0.1).band("B1", far.clone());
        let req = request();
        assert_eq!(near.footprint(&req.index), Some(near.bands["B8"].bbox()));

        let mut moved = scene("moved", 4, 1.0, 0.5, 0.1);
        moved.bands.insert("B8".into(), far);
        let catalog = SceneCatalog::new(vec![near, moved]);
        let ids: Vec<&str> = catalog.matching(&req).map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["near"]);
    }

    #[test]
    fn reduces_each_matching_scene() {
        let catalog = SceneCatalog::new(vec![
            scene("a", 10, 1.0, 0.8, 0.2),
            scene("b", 3, 1.0, 0.3, 0.3),
        ]);
        let samples = catalog.reduce(&request()).unwrap();
        assert_eq!(samples.len(), 2);
        approx::assert_relative_eq!(samples[0].value.unwrap(), 0.6, epsilon = 1e-12);
        approx::assert_relative_eq!(samples[1].value.unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn masked_scene_yields_missing_value() {
        let catalog = SceneCatalog::new(vec![scene("masked", 3, 1.0, f64::NAN, f64::NAN)]);
        let samples = catalog.reduce(&request()).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, None);
    }

    #[test]
    fn scene_missing_a_band_fails() {
        let broken = Scene::new("broken", S2, Utc.with_ymd_and_hms(2021, 5, 3, 0, 0, 0).unwrap(), 0.0)
            .band("B8", band(0.5));
        let catalog = SceneCatalog::new(vec![broken]);
        assert!(catalog.reduce(&request()).is_err());
    }
}
