//! Lowering a [`ReductionRequest`] into an Earth Engine expression.
//!
//! The graph mirrors the client-library chain
//!
//! ```text
//! ImageCollection(id)
//!     .filterBounds(aoi)
//!     .filterDate(start, end + 1 day)
//!     .filter(Filter.lt(cloud_property, max))
//!     .map(img -> Feature(null, {
//!         <index>: <band math>.rename(<index>).reduceRegion(mean, aoi, scale).get(<index>),
//!         date:    img.get("system:time_start"),
//!     }))
//! ```
//!
//! and is evaluated in a single `value:compute` call. The response is a
//! feature collection with one feature per matching scene.

use chrono::{DateTime, Utc};
use tracing::debug;
use verdant_core::index::{BandExpr, BinaryOp};
use verdant_core::{AreaOfInterest, IndexDefinition, RawSample, ReductionRequest, SceneFilter};

use crate::ee_models::FeatureCollection;
use crate::error::{CloudError, Result};
use crate::expression::{Expression, ExpressionBuilder, ValueNode};

/// Name of the mapped image inside the `Collection.map` body.
pub const MAPPING_VAR: &str = "_MAPPING_VAR_0_0";

/// Image property holding the acquisition time, epoch milliseconds.
pub const TIME_START: &str = "system:time_start";

/// Feature property carrying the acquisition time in the result.
pub const DATE_PROPERTY: &str = "date";

/// Build the full per-scene reduction for `request`.
pub fn series_expression(request: &ReductionRequest) -> Expression {
    let mut b = ExpressionBuilder::new();

    // Shared between the bounds filter and the reduction
    let geometry = b.push(aoi_geometry(&request.filter.aoi));
    let collection = b.push(filtered_collection(&request.filter, geometry.clone()));

    let body = b.push_id(reduce_image(&request.index, geometry, request.scale_m));
    let mapped = ValueNode::invoke(
        "Collection.map",
        [
            ("collection", collection),
            (
                "baseAlgorithm",
                ValueNode::FunctionDefinitionValue {
                    argument_names: vec![MAPPING_VAR.to_string()],
                    body,
                },
            ),
        ],
    );

    b.finish(mapped)
}

/// Circle around the AOI center: `Point([lon, lat]).buffer(radius)`.
pub fn aoi_geometry(aoi: &AreaOfInterest) -> ValueNode {
    let center = aoi.center();
    let point = ValueNode::invoke(
        "GeometryConstructors.Point",
        [(
            "coordinates",
            ValueNode::constant(serde_json::json!([center.lon, center.lat])),
        )],
    );
    ValueNode::invoke(
        "Geometry.buffer",
        [
            ("geometry", point),
            ("distance", ValueNode::constant(aoi.radius_m())),
        ],
    )
}

/// Scene collection narrowed by bounds, dates and cloud cover.
pub fn filtered_collection(filter: &SceneFilter, geometry: ValueNode) -> ValueNode {
    let load = ValueNode::invoke(
        "ImageCollection.load",
        [("id", ValueNode::constant(filter.collection.as_str()))],
    );

    let bounds = ValueNode::invoke(
        "Filter.intersects",
        [
            ("leftField", ValueNode::constant(".all")),
            ("rightValue", geometry),
        ],
    );

    let date_range = ValueNode::invoke(
        "DateRange",
        [
            ("start", date_constant(filter.time_range.start())),
            ("end", date_constant(filter.time_range.end_exclusive())),
        ],
    );
    let dates = ValueNode::invoke(
        "Filter.dateRangeContains",
        [
            ("leftValue", date_range),
            ("rightField", ValueNode::constant(TIME_START)),
        ],
    );

    let clouds = ValueNode::invoke(
        "Filter.lessThan",
        [
            ("leftField", ValueNode::constant(filter.cloud_property.as_str())),
            ("rightValue", ValueNode::constant(filter.max_cloud_cover)),
        ],
    );

    [bounds, dates, clouds]
        .into_iter()
        .fold(load, |collection, f| {
            ValueNode::invoke("Collection.filter", [("collection", collection), ("filter", f)])
        })
}

fn date_constant(date: chrono::NaiveDate) -> ValueNode {
    ValueNode::constant(date.format("%Y-%m-%d").to_string())
}

/// Body of the mapped function: one feature per scene.
fn reduce_image(index: &IndexDefinition, geometry: ValueNode, scale_m: f64) -> ValueNode {
    let image = ValueNode::argument(MAPPING_VAR);

    let derived = ValueNode::invoke(
        "Image.rename",
        [
            ("input", lower_band_expr(index.expr(), index)),
            ("names", ValueNode::constant(serde_json::json!([index.name()]))),
        ],
    );

    let reduced = ValueNode::invoke(
        "Image.reduceRegion",
        [
            ("image", derived),
            ("reducer", ValueNode::invoke("Reducer.mean", Vec::<(&str, ValueNode)>::new())),
            ("geometry", geometry),
            ("scale", ValueNode::constant(scale_m)),
        ],
    );

    let value = ValueNode::invoke(
        "Dictionary.get",
        [
            ("dictionary", reduced),
            ("key", ValueNode::constant(index.name())),
        ],
    );
    let date = ValueNode::invoke(
        "Element.get",
        [
            ("object", image),
            ("property", ValueNode::constant(TIME_START)),
        ],
    );

    ValueNode::invoke(
        "Feature",
        [(
            "metadata",
            ValueNode::dictionary([(index.name(), value), (DATE_PROPERTY, date)]),
        )],
    )
}

/// Translate a formula into `Image.*` arithmetic on the mapped image.
///
/// Aliases are resolved through the index bindings; [`IndexDefinition`]
/// guarantees every alias is bound.
pub fn lower_band_expr(expr: &BandExpr, index: &IndexDefinition) -> ValueNode {
    match expr {
        BandExpr::Num(n) => image_constant(*n),
        BandExpr::Band(alias) => {
            let band = index.band_for(alias).unwrap_or(alias.as_str());
            ValueNode::invoke(
                "Image.select",
                [
                    ("input", ValueNode::argument(MAPPING_VAR)),
                    ("bandSelectors", ValueNode::constant(serde_json::json!([band]))),
                ],
            )
        }
        BandExpr::Binary { op, left, right } => {
            let function = match op {
                BinaryOp::Add => "Image.add",
                BinaryOp::Subtract => "Image.subtract",
                BinaryOp::Multiply => "Image.multiply",
                BinaryOp::Divide => "Image.divide",
            };
            ValueNode::invoke(
                function,
                [
                    ("image1", lower_band_expr(left, index)),
                    ("image2", lower_band_expr(right, index)),
                ],
            )
        }
        BandExpr::Neg(inner) => ValueNode::invoke(
            "Image.multiply",
            [
                ("image1", lower_band_expr(inner, index)),
                ("image2", image_constant(-1.0)),
            ],
        ),
    }
}

fn image_constant(value: f64) -> ValueNode {
    ValueNode::invoke("Image.constant", [("value", ValueNode::constant(value))])
}

/// Parse the `value:compute` result into raw samples, in response order.
///
/// A `null` or absent index value is a missing sample. A feature without a
/// usable `date` makes the whole response invalid.
pub fn parse_samples(result: serde_json::Value, index_name: &str) -> Result<Vec<RawSample>> {
    let collection: FeatureCollection = serde_json::from_value(result)
        .map_err(|e| CloudError::InvalidResponse(format!("expected a FeatureCollection: {e}")))?;

    debug!("value:compute returned {} features", collection.features.len());

    collection
        .features
        .into_iter()
        .map(|feature| {
            let millis = feature
                .properties
                .get(DATE_PROPERTY)
                .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
                .ok_or_else(|| {
                    CloudError::InvalidResponse(format!(
                        "feature {} has no '{}' property",
                        feature.id.as_deref().unwrap_or("?"),
                        DATE_PROPERTY
                    ))
                })?;
            let timestamp: DateTime<Utc> = DateTime::from_timestamp_millis(millis)
                .ok_or_else(|| {
                    CloudError::InvalidResponse(format!("timestamp out of range: {millis}"))
                })?;
            let value = feature.properties.get(index_name).and_then(|v| v.as_f64());
            Ok(RawSample::new(timestamp, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;
    use verdant_core::{LatLon, TimeRange};

    fn request() -> ReductionRequest {
        let aoi = AreaOfInterest::new(LatLon::new(-31.7668, -52.3448), 5000.0);
        let range = TimeRange::new(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        );
        ReductionRequest::new(SceneFilter::new(aoi, range, 10.0), IndexDefinition::ndvi("B8", "B4"))
    }

    fn resolved<'a>(expr: &'a Expression, node: &'a ValueNode) -> &'a ValueNode {
        expr.resolve(node).expect("dangling reference")
    }

    #[test]
    fn result_maps_a_function_over_the_filtered_collection() {
        let expr = series_expression(&request());
        let root = expr.result_node().unwrap();
        assert_eq!(root.function_name(), Some("Collection.map"));

        match root.arg("baseAlgorithm").unwrap() {
            ValueNode::FunctionDefinitionValue {
                argument_names,
                body,
            } => {
                assert_eq!(argument_names, &vec![MAPPING_VAR.to_string()]);
                let body = &expr.values[body];
                assert_eq!(body.function_name(), Some("Feature"));
            }
            other => panic!("expected a function definition, got {:?}", other),
        }
    }

    #[test]
    fn filter_chain_carries_bounds_dates_and_clouds() {
        let expr = series_expression(&request());
        let root = expr.result_node().unwrap();

        let mut filters = Vec::new();
        let mut node = resolved(&expr, root.arg("collection").unwrap());
        while node.function_name() == Some("Collection.filter") {
            filters.push(node.arg("filter").unwrap().clone());
            node = resolved(&expr, node.arg("collection").unwrap());
        }
        assert_eq!(node.function_name(), Some("ImageCollection.load"));
        assert_eq!(
            node.arg("id"),
            Some(&ValueNode::constant("COPERNICUS/S2_SR_HARMONIZED"))
        );

        // Innermost first
        filters.reverse();
        let names: Vec<_> = filters.iter().map(|f| f.function_name().unwrap()).collect();
        assert_eq!(
            names,
            vec!["Filter.intersects", "Filter.dateRangeContains", "Filter.lessThan"]
        );

        let range = filters[1].arg("leftValue").unwrap();
        assert_eq!(range.arg("start"), Some(&ValueNode::constant("2020-01-01")));
        // Inclusive end is sent as the next day
        assert_eq!(range.arg("end"), Some(&ValueNode::constant("2024-01-01")));

        assert_eq!(
            filters[2].arg("leftField"),
            Some(&ValueNode::constant("CLOUDY_PIXEL_PERCENTAGE"))
        );
        assert_eq!(filters[2].arg("rightValue"), Some(&ValueNode::constant(10.0)));
    }

    #[test]
    fn geometry_is_a_buffered_point() {
        let expr = series_expression(&request());
        let geom = &expr.values["0"];
        assert_eq!(geom.function_name(), Some("Geometry.buffer"));
        assert_eq!(geom.arg("distance"), Some(&ValueNode::constant(5000.0)));
        let point = geom.arg("geometry").unwrap();
        assert_eq!(
            point.arg("coordinates"),
            Some(&ValueNode::constant(json!([-52.3448, -31.7668])))
        );
    }

    #[test]
    fn ndvi_lowers_to_image_arithmetic() {
        let index = IndexDefinition::ndvi("B8", "B4");
        let node = lower_band_expr(index.expr(), &index);
        assert_eq!(node.function_name(), Some("Image.divide"));
        let diff = node.arg("image1").unwrap();
        assert_eq!(diff.function_name(), Some("Image.subtract"));
        assert_eq!(
            diff.arg("image1").unwrap().arg("bandSelectors"),
            Some(&ValueNode::constant(json!(["B8"])))
        );
        assert_eq!(
            diff.arg("image2").unwrap().arg("bandSelectors"),
            Some(&ValueNode::constant(json!(["B4"])))
        );
        assert_eq!(node.arg("image2").unwrap().function_name(), Some("Image.add"));
    }

    #[test]
    fn constants_and_negation_lower_to_constant_images() {
        let index =
            IndexDefinition::new("NEG", "-(2 * NIR)", &[("NIR", "B8")]).unwrap();
        let node = lower_band_expr(index.expr(), &index);
        assert_eq!(node.function_name(), Some("Image.multiply"));
        assert_eq!(
            node.arg("image2").unwrap().arg("value"),
            Some(&ValueNode::constant(-1.0))
        );
        let inner = node.arg("image1").unwrap();
        assert_eq!(inner.arg("image1").unwrap().function_name(), Some("Image.constant"));
    }

    #[test]
    fn reduction_uses_mean_at_scale() {
        let expr = series_expression(&request().scale(20.0));
        let root = expr.result_node().unwrap();
        let body = match root.arg("baseAlgorithm").unwrap() {
            ValueNode::FunctionDefinitionValue { body, .. } => &expr.values[body],
            _ => unreachable!(),
        };
        let metadata = match body.arg("metadata").unwrap() {
            ValueNode::DictionaryValue { values } => values,
            other => panic!("unexpected metadata {:?}", other),
        };
        assert_eq!(
            metadata["date"].arg("property"),
            Some(&ValueNode::constant("system:time_start"))
        );
        let reduce = metadata["NDVI"].arg("dictionary").unwrap();
        assert_eq!(reduce.function_name(), Some("Image.reduceRegion"));
        assert_eq!(reduce.arg("scale"), Some(&ValueNode::constant(20.0)));
        assert_eq!(
            reduce.arg("reducer").unwrap().function_name(),
            Some("Reducer.mean")
        );
        assert_eq!(reduce.arg("geometry"), Some(&ValueNode::reference("0")));
    }

    #[test]
    fn parse_samples_keeps_missing_values_as_none() {
        let result = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": null, "properties": {"NDVI": 0.6, "date": 1_620_000_000_000_i64}},
                {"type": "Feature", "geometry": null, "properties": {"NDVI": null, "date": 1_610_000_000_000_i64}},
                {"type": "Feature", "geometry": null, "properties": {"date": 1_600_000_000_000_i64}}
            ]
        });
        let samples = parse_samples(result, "NDVI").unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].value, Some(0.6));
        assert_eq!(
            samples[0].timestamp,
            Utc.timestamp_millis_opt(1_620_000_000_000).unwrap()
        );
        assert_eq!(samples[1].value, None);
        assert_eq!(samples[2].value, None);
    }

    #[test]
    fn parse_samples_rejects_missing_date() {
        let result = json!({"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": null, "id": "s1", "properties": {"NDVI": 0.3}}
        ]});
        assert!(matches!(
            parse_samples(result, "NDVI"),
            Err(CloudError::InvalidResponse(_))
        ));
    }

    #[test]
    fn parse_samples_rejects_non_collections() {
        assert!(parse_samples(json!(42), "NDVI").is_err());
    }

    #[test]
    fn empty_collection_parses_to_no_samples() {
        let result = json!({"type": "FeatureCollection", "features": []});
        assert!(parse_samples(result, "NDVI").unwrap().is_empty());
    }
}
