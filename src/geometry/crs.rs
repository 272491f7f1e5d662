//! Coordinate reference system conversions.
//!
//! Supports the two systems the pipelines need: WGS84 lon/lat degrees and
//! planar web Mercator metres. Reprojection rewrites every vertex of a
//! table; a forward/inverse round trip is idempotent within floating-point
//! tolerance.

use crate::models::{Crs, DataError, Feature, FeatureTable, Geometry};
use geo_types::{Coord, LineString, MultiPolygon, Point, Polygon};
use std::f64::consts::PI;

/// WGS84 semi-major axis in metres (the sphere web Mercator is built on).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude bound of the Mercator plane; higher latitudes are clamped.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Project a WGS84 lon/lat pair onto the Mercator plane.
pub fn wgs84_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let x = EARTH_RADIUS_M * lon.to_radians();
    let y = EARTH_RADIUS_M * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Invert [`wgs84_to_mercator`].
pub fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}

fn convert(coord: Coord<f64>, from: Crs, to: Crs) -> Coord<f64> {
    match (from, to) {
        (Crs::Wgs84, Crs::WebMercator) => {
            let (x, y) = wgs84_to_mercator(coord.x, coord.y);
            Coord { x, y }
        }
        (Crs::WebMercator, Crs::Wgs84) => {
            let (x, y) = mercator_to_wgs84(coord.x, coord.y);
            Coord { x, y }
        }
        _ => coord,
    }
}

fn convert_ring(ring: &LineString<f64>, from: Crs, to: Crs) -> LineString<f64> {
    LineString::new(ring.0.iter().map(|c| convert(*c, from, to)).collect())
}

fn convert_polygon(poly: &Polygon<f64>, from: Crs, to: Crs) -> Polygon<f64> {
    Polygon::new(
        convert_ring(poly.exterior(), from, to),
        poly.interiors()
            .iter()
            .map(|r| convert_ring(r, from, to))
            .collect(),
    )
}

/// Reproject a single geometry.
pub fn reproject_geometry(geometry: &Geometry, from: Crs, to: Crs) -> Geometry {
    match geometry {
        Geometry::Point(p) => Geometry::Point(Point(convert(p.0, from, to))),
        Geometry::Polygon(poly) => Geometry::Polygon(convert_polygon(poly, from, to)),
        Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(MultiPolygon(
            mp.0.iter().map(|p| convert_polygon(p, from, to)).collect(),
        )),
    }
}

/// Reproject every geometry of a table into `target`, returning a new table.
///
/// A table already in `target` is returned unchanged (cheap clone of the
/// attribute data, no vertex work).
pub fn reproject(table: &FeatureTable, target: Crs) -> Result<FeatureTable, DataError> {
    if table.crs == target {
        return Ok(table.clone());
    }

    let mut out = FeatureTable::new(target);
    out.columns = table.columns.clone();
    for feature in &table.features {
        out.features.push(Feature {
            geometry: feature
                .geometry
                .as_ref()
                .map(|g| reproject_geometry(g, table.crs, target)),
            attributes: feature.attributes.clone(),
        });
    }
    Ok(out)
}

/// Ensure two tables share a CRS, erroring with both systems named.
pub fn require_same_crs(left: &FeatureTable, right: &FeatureTable) -> Result<(), DataError> {
    if left.crs == right.crs {
        Ok(())
    } else {
        Err(DataError::CrsMismatch {
            left: left.crs,
            right: right.crs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Value;

    #[test]
    fn test_equator_origin_maps_to_plane_origin() {
        let (x, y) = wgs84_to_mercator(0.0, 0.0);
        assert!(x.abs() < 1e-9);
        assert!(y.abs() < 1e-9);
    }

    #[test]
    fn test_known_projection_value() {
        // One degree of longitude at the equator is ~111.3 km on the plane.
        let (x, _) = wgs84_to_mercator(1.0, 0.0);
        assert!((x - 111_319.49).abs() < 1.0);
    }

    #[test]
    fn test_round_trip_is_idempotent() {
        for &(lon, lat) in &[
            (0.0, 0.0),
            (-1.47, 53.38),
            (151.21, -33.87),
            (-179.9, 80.0),
        ] {
            let (x, y) = wgs84_to_mercator(lon, lat);
            let (lon2, lat2) = mercator_to_wgs84(x, y);
            assert!((lon - lon2).abs() < 1e-9, "lon drifted for {lon}");
            assert!((lat - lat2).abs() < 1e-9, "lat drifted for {lat}");
        }
    }

    #[test]
    fn test_polar_latitudes_clamped() {
        let (_, y_pole) = wgs84_to_mercator(0.0, 90.0);
        let (_, y_max) = wgs84_to_mercator(0.0, MAX_MERCATOR_LAT);
        assert_eq!(y_pole, y_max);
        assert!(y_pole.is_finite());
    }

    #[test]
    fn test_reproject_table_round_trip() {
        let mut table = FeatureTable::new(Crs::Wgs84);
        let mut feature = Feature::default();
        feature.geometry = Some(Geometry::Point(Point::new(-1.47, 53.38)));
        feature
            .attributes
            .insert("name".to_string(), Value::from("Sheffield"));
        table.push(feature);

        let planar = reproject(&table, Crs::WebMercator).unwrap();
        assert_eq!(planar.crs, Crs::WebMercator);
        assert_eq!(planar.len(), 1);

        let back = reproject(&planar, Crs::Wgs84).unwrap();
        match back.features[0].geometry.as_ref().unwrap() {
            Geometry::Point(p) => {
                assert!((p.x() + 1.47).abs() < 1e-9);
                assert!((p.y() - 53.38).abs() < 1e-9);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
        // Attributes survive reprojection untouched.
        assert_eq!(back.features[0].text("name"), Some("Sheffield"));
    }

    #[test]
    fn test_same_crs_is_identity() {
        let table = FeatureTable::new(Crs::Wgs84);
        let same = reproject(&table, Crs::Wgs84).unwrap();
        assert_eq!(same.crs, Crs::Wgs84);
    }

    #[test]
    fn test_require_same_crs() {
        let a = FeatureTable::new(Crs::Wgs84);
        let b = FeatureTable::new(Crs::WebMercator);
        let err = require_same_crs(&a, &b).unwrap_err();
        assert!(err.to_string().contains("EPSG:4326"));
        assert!(err.to_string().contains("EPSG:3857"));
        assert!(require_same_crs(&a, &a.clone()).is_ok());
    }
}
