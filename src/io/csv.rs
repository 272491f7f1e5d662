//! CSV loading.
//!
//! CSV tables carry attributes only; point geometries are built afterwards
//! from coordinate columns by [`crate::ops::points::attach_points`].

use crate::models::{Crs, Feature, FeatureTable, Value};
use anyhow::{Context, Result};
use std::path::Path;

/// Load a CSV file (with a header row) into a geometry-less [`FeatureTable`].
///
/// Numeric-looking fields become numbers, empty fields become null, anything
/// else is kept as text. The table is nominally WGS84 so that attaching
/// lon/lat point geometries later needs no CRS change.
pub fn load_csv(path: &Path) -> Result<FeatureTable> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read CSV header: {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut table = FeatureTable::new(Crs::Wgs84);
    for header in &headers {
        table.register_column(header);
    }

    for (row, record) in reader.records().enumerate() {
        let record = record
            .with_context(|| format!("Failed to read row {} of {}", row + 1, path.display()))?;

        let mut feature = Feature::default();
        for (header, field) in headers.iter().zip(record.iter()) {
            feature
                .attributes
                .insert(header.clone(), Value::parse(field));
        }
        table.features.push(feature);
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_csv_types_and_order() {
        let file = write_fixture("code,name,population\nW1,Central,1200\nW2,Harbour,\n");
        let table = load_csv(file.path()).unwrap();

        assert_eq!(table.columns, vec!["code", "name", "population"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.geometry_count(), 0);

        assert_eq!(table.features[0].text("code"), Some("W1"));
        assert_eq!(table.features[0].number("population"), Some(1200.0));
        assert!(table.features[1].get("population").is_null());
        assert_eq!(table.features[1].text("name"), Some("Harbour"));
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = load_csv(Path::new("no/such/table.csv")).unwrap_err();
        assert!(format!("{:#}", err).contains("no/such/table.csv"));
    }

    #[test]
    fn test_ragged_row_is_fatal() {
        let file = write_fixture("a,b\n1,2\n3\n");
        let err = load_csv(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("row 2"));
    }
}
