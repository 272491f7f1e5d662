//! Point geometry construction from coordinate columns.

use crate::models::{Crs, DataError, FeatureTable, Geometry, Value};
use geo_types::Point;

/// Build a WGS84 point geometry per row from numeric lon/lat columns.
///
/// The produced points carry the input coordinates exactly; nothing is
/// transformed until an explicit reprojection. Any row with a missing or
/// non-numeric coordinate, or one outside the valid lon/lat domain, fails
/// the whole operation with the row and column named.
pub fn attach_points(
    table: &FeatureTable,
    lon_col: &str,
    lat_col: &str,
) -> Result<FeatureTable, DataError> {
    table.require_column("point table", lon_col)?;
    table.require_column("point table", lat_col)?;

    let mut out = FeatureTable::new(Crs::Wgs84);
    out.columns = table.columns.clone();

    for (row, feature) in table.features.iter().enumerate() {
        let lon = coordinate(row, lon_col, feature.get(lon_col), -180.0, 180.0)?;
        let lat = coordinate(row, lat_col, feature.get(lat_col), -90.0, 90.0)?;

        let mut feature = feature.clone();
        feature.geometry = Some(Geometry::Point(Point::new(lon, lat)));
        out.features.push(feature);
    }

    Ok(out)
}

fn coordinate(
    row: usize,
    column: &str,
    value: &Value,
    min: f64,
    max: f64,
) -> Result<f64, DataError> {
    let number = value.as_f64().ok_or_else(|| DataError::BadCoordinate {
        row,
        column: column.to_string(),
        value: value.to_string(),
    })?;

    if !(min..=max).contains(&number) {
        return Err(DataError::BadCoordinate {
            row,
            column: column.to_string(),
            value: value.to_string(),
        });
    }
    Ok(number)
}
