//! Data models for the map builder.
//!
//! This module contains the core structures used throughout the
//! application: feature tables, attribute values, geometries, and
//! coordinate reference systems.

use geo_types::{MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Coordinate reference system of a feature table.
///
/// Every geometry in a table shares the table's CRS until the table is
/// explicitly reprojected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Crs {
    /// Geographic longitude/latitude in degrees (EPSG:4326).
    Wgs84,
    /// Planar web/spherical Mercator in metres (EPSG:3857).
    WebMercator,
}

impl Crs {
    /// Returns the EPSG code for this reference system.
    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::WebMercator => 3857,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// A scalar attribute value attached to a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// Numeric value (integers are widened to f64).
    Number(f64),
    /// Text value.
    Text(String),
}

impl Value {
    /// Returns the numeric content, if this value is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the textual content, if this value is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Parse a raw CSV/property field: empty → Null, numeric → Number,
    /// anything else → Text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, ""),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Geometry attached to a feature.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point<f64>),
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl Geometry {
    /// Human-readable geometry kind, used in error messages and catalogs.
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Number of vertices across all rings/points.
    pub fn vertex_count(&self) -> usize {
        match self {
            Geometry::Point(_) => 1,
            Geometry::Polygon(p) => {
                p.exterior().0.len() + p.interiors().iter().map(|r| r.0.len()).sum::<usize>()
            }
            Geometry::MultiPolygon(mp) => mp
                .0
                .iter()
                .map(|p| {
                    p.exterior().0.len()
                        + p.interiors().iter().map(|r| r.0.len()).sum::<usize>()
                })
                .sum(),
        }
    }
}

/// A single record: an optional geometry plus named scalar attributes.
#[derive(Debug, Clone, Default)]
pub struct Feature {
    /// Geometry in the owning table's CRS, if any.
    pub geometry: Option<Geometry>,
    /// Named attribute values.
    pub attributes: HashMap<String, Value>,
}

impl Feature {
    /// Look up an attribute, treating absence as Null.
    pub fn get(&self, column: &str) -> &Value {
        self.attributes.get(column).unwrap_or(&Value::Null)
    }

    /// Numeric attribute accessor.
    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).as_f64()
    }

    /// Text attribute accessor.
    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).as_text()
    }
}

/// An ordered collection of features sharing one CRS.
///
/// Column names are tracked in first-seen order so that derived outputs
/// (catalogs, joins) stay stable across runs.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    /// Reference system shared by every geometry in the table.
    pub crs: Crs,
    /// Attribute column names in first-seen order.
    pub columns: Vec<String>,
    /// The records.
    pub features: Vec<Feature>,
}

impl FeatureTable {
    /// Creates an empty table in the given CRS.
    pub fn new(crs: Crs) -> Self {
        Self {
            crs,
            columns: Vec::new(),
            features: Vec::new(),
        }
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// True when the table holds no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// True when the column name is registered.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Registers a column name if it is not yet known.
    pub fn register_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
    }

    /// Appends a feature, registering any new attribute columns.
    pub fn push(&mut self, feature: Feature) {
        for name in feature.attributes.keys() {
            if !self.has_column(name) {
                self.columns.push(name.clone());
            }
        }
        self.features.push(feature);
    }

    /// Fails with [`DataError::MissingColumn`] unless the column exists.
    pub fn require_column(&self, table_name: &str, column: &str) -> Result<(), DataError> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(DataError::MissingColumn {
                table: table_name.to_string(),
                column: column.to_string(),
            })
        }
    }

    /// Count of features carrying a geometry.
    pub fn geometry_count(&self) -> usize {
        self.features.iter().filter(|f| f.geometry.is_some()).count()
    }
}

/// One group produced by an aggregation: a label and its summed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    /// The group label (value of the grouping column).
    pub label: String,
    /// Sum of the numeric column over the group's rows.
    pub total: f64,
    /// Number of rows that contributed to the sum.
    pub rows: usize,
}

/// Result of a group-by-sum aggregation.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    /// Groups in ascending label order.
    pub groups: Vec<GroupTotal>,
    /// Index into `groups` of the smallest total (first label wins ties).
    pub min: usize,
    /// Index into `groups` of the largest total (first label wins ties).
    pub max: usize,
}

impl AggregateReport {
    /// The group with the smallest total.
    pub fn min_group(&self) -> &GroupTotal {
        &self.groups[self.min]
    }

    /// The group with the largest total.
    pub fn max_group(&self) -> &GroupTotal {
        &self.groups[self.max]
    }

    /// Sum over all group totals.
    pub fn grand_total(&self) -> f64 {
        self.groups.iter().map(|g| g.total).sum()
    }
}

/// Errors raised by the data layer.
///
/// All of these are fatal: the pipelines surface them immediately with the
/// failing file/column name and produce no partial output.
#[derive(Debug, Error)]
pub enum DataError {
    /// A named column was not found in a table.
    #[error("column `{column}` not found in {table}")]
    MissingColumn { table: String, column: String },

    /// A coordinate column held a value that is not a usable coordinate.
    #[error("row {row}: column `{column}` is not a valid coordinate (got `{value}`)")]
    BadCoordinate {
        row: usize,
        column: String,
        value: String,
    },

    /// A numeric column held a non-numeric value.
    #[error("row {row}: column `{column}` is not numeric (got `{value}`)")]
    NotNumeric {
        row: usize,
        column: String,
        value: String,
    },

    /// Two tables that must share a CRS do not.
    #[error("CRS mismatch: {left} vs {right}; reproject both tables first")]
    CrsMismatch { left: Crs, right: Crs },

    /// A vector file contained a geometry kind the pipeline cannot use.
    #[error("feature {index}: unsupported geometry type `{kind}`")]
    UnsupportedGeometry { index: usize, kind: String },

    /// A table that must contain geometries has none.
    #[error("{table} contains no usable geometries")]
    NoGeometry { table: String },

    /// An aggregation found no non-null group labels.
    #[error("no non-null `{column}` values to group by")]
    EmptyAggregation { column: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Polygon};

    #[test]
    fn test_crs_display() {
        assert_eq!(Crs::Wgs84.to_string(), "EPSG:4326");
        assert_eq!(Crs::WebMercator.to_string(), "EPSG:3857");
    }

    #[test]
    fn test_value_parse() {
        assert_eq!(Value::parse("12.5"), Value::Number(12.5));
        assert_eq!(Value::parse("  -3 "), Value::Number(-3.0));
        assert_eq!(Value::parse(""), Value::Null);
        assert_eq!(Value::parse("   "), Value::Null);
        assert_eq!(Value::parse("Ward 7"), Value::Text("Ward 7".to_string()));
        // NaN/inf spellings must not become numbers
        assert_eq!(Value::parse("NaN"), Value::Text("NaN".to_string()));
    }

    #[test]
    fn test_feature_accessors() {
        let mut feature = Feature::default();
        feature
            .attributes
            .insert("population".to_string(), Value::Number(1200.0));
        feature
            .attributes
            .insert("name".to_string(), Value::Text("Central".to_string()));

        assert_eq!(feature.number("population"), Some(1200.0));
        assert_eq!(feature.text("name"), Some("Central"));
        assert!(feature.get("missing").is_null());
    }

    #[test]
    fn test_table_registers_columns_in_order() {
        let mut table = FeatureTable::new(Crs::Wgs84);

        let mut a = Feature::default();
        a.attributes.insert("code".to_string(), Value::from("W1"));
        table.push(a);

        let mut b = Feature::default();
        b.attributes.insert("code".to_string(), Value::from("W2"));
        b.attributes
            .insert("population".to_string(), Value::Number(10.0));
        table.push(b);

        assert_eq!(table.columns, vec!["code", "population"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_require_column() {
        let mut table = FeatureTable::new(Crs::Wgs84);
        table.register_column("code");

        assert!(table.require_column("wards", "code").is_ok());
        let err = table.require_column("wards", "nope").unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { .. }));
        assert!(err.to_string().contains("nope"));
        assert!(err.to_string().contains("wards"));
    }

    #[test]
    fn test_geometry_vertex_count() {
        let ring = LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);
        let poly = Polygon::new(ring, vec![]);
        assert_eq!(Geometry::Polygon(poly).vertex_count(), 4);
        assert_eq!(Geometry::Point(Point::new(1.0, 2.0)).vertex_count(), 1);
    }
}
