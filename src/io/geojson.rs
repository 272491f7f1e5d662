//! GeoJSON loading and conversion.
//!
//! GeoJSON coordinates are WGS84 lon/lat by specification, so loaded tables
//! always start in [`Crs::Wgs84`].

use crate::models::{Crs, DataError, Feature, FeatureTable, Geometry, Value};
use anyhow::{Context, Result};
use geo_types::{MultiPolygon, Point, Polygon};
use std::path::Path;

/// Load a GeoJSON FeatureCollection into a [`FeatureTable`].
///
/// Point, Polygon and MultiPolygon geometries are accepted; any other
/// geometry kind fails the load with the feature index. Features without a
/// geometry are kept as attribute-only rows.
pub fn load_geojson(path: &Path) -> Result<FeatureTable> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read vector file: {}", path.display()))?;

    let collection: geojson::FeatureCollection = content
        .parse()
        .with_context(|| format!("Failed to parse GeoJSON: {}", path.display()))?;

    let mut table = FeatureTable::new(Crs::Wgs84);
    for (index, gj_feature) in collection.features.into_iter().enumerate() {
        let geometry = match gj_feature.geometry {
            Some(g) => Some(
                convert_geometry(index, g.value)
                    .with_context(|| format!("In vector file: {}", path.display()))?,
            ),
            None => None,
        };

        let mut feature = Feature {
            geometry,
            ..Feature::default()
        };
        if let Some(properties) = gj_feature.properties {
            for (name, json) in properties {
                table.register_column(&name);
                feature.attributes.insert(name, json_to_value(json));
            }
        }
        table.features.push(feature);
    }

    Ok(table)
}

fn convert_geometry(index: usize, value: geojson::Value) -> Result<Geometry, DataError> {
    let kind = kind_name(&value);
    match value {
        geojson::Value::Point(_) => Point::try_from(value)
            .map(Geometry::Point)
            .map_err(|_| unsupported(index, kind)),
        geojson::Value::Polygon(_) => Polygon::try_from(value)
            .map(Geometry::Polygon)
            .map_err(|_| unsupported(index, kind)),
        geojson::Value::MultiPolygon(_) => MultiPolygon::try_from(value)
            .map(Geometry::MultiPolygon)
            .map_err(|_| unsupported(index, kind)),
        _ => Err(unsupported(index, kind)),
    }
}

fn unsupported(index: usize, kind: &str) -> DataError {
    DataError::UnsupportedGeometry {
        index,
        kind: kind.to_string(),
    }
}

fn kind_name(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() => Value::Number(f),
            _ => Value::Null,
        },
        serde_json::Value::String(s) => Value::Text(s),
        serde_json::Value::Bool(b) => Value::Text(b.to_string()),
        other => Value::Text(other.to_string()),
    }
}

/// Convert one of our geometries back into a GeoJSON geometry.
///
/// Only meaningful for WGS84 tables; the web renderer reprojects before
/// serializing.
pub fn geometry_to_geojson(geometry: &Geometry) -> geojson::Geometry {
    let value = match geometry {
        Geometry::Point(p) => geojson::Value::from(p),
        Geometry::Polygon(poly) => geojson::Value::from(poly),
        Geometry::MultiPolygon(mp) => geojson::Value::from(mp),
    };
    geojson::Geometry::new(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const WARDS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
                },
                "properties": {"code": "W1", "population": 120}
            },
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [0.5, 0.5]},
                "properties": {"code": "W2", "population": null}
            }
        ]
    }"#;

    fn write_fixture(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_feature_collection() {
        let file = write_fixture(WARDS);
        let table = load_geojson(file.path()).unwrap();

        assert_eq!(table.crs, Crs::Wgs84);
        assert_eq!(table.len(), 2);
        assert_eq!(table.geometry_count(), 2);
        assert!(table.has_column("code"));
        assert!(table.has_column("population"));

        assert_eq!(table.features[0].text("code"), Some("W1"));
        assert_eq!(table.features[0].number("population"), Some(120.0));
        assert!(table.features[1].get("population").is_null());

        match table.features[1].geometry.as_ref().unwrap() {
            Geometry::Point(p) => {
                assert_eq!(p.x(), 0.5);
                assert_eq!(p.y(), 0.5);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_geometry_kind_fails_with_index() {
        let content = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]},
                    "properties": {}
                }
            ]
        }"#;
        let file = write_fixture(content);
        let err = load_geojson(file.path()).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("LineString"), "got: {message}");
        assert!(message.contains("feature 0"), "got: {message}");
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = load_geojson(Path::new("no/such/file.geojson")).unwrap_err();
        assert!(format!("{:#}", err).contains("no/such/file.geojson"));
    }

    #[test]
    fn test_geometry_round_trip() {
        let file = write_fixture(WARDS);
        let table = load_geojson(file.path()).unwrap();
        let gj = geometry_to_geojson(table.features[0].geometry.as_ref().unwrap());
        assert!(matches!(gj.value, geojson::Value::Polygon(_)));
    }
}
