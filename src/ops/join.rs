//! Attribute join between two feature tables.

use crate::models::{DataError, FeatureTable, Value};
use std::collections::HashMap;
use tracing::debug;

/// Inner join: left rows augmented with matching right-table columns.
///
/// The policy is deliberately explicit because it changes result size:
/// unmatched rows on either side are dropped, and each left row produces one
/// output row per matching right row, so N matching key pairs yield exactly
/// N rows. Left geometry and CRS are kept. Right columns that collide with a
/// left column name are appended with a `_right` suffix.
pub fn inner_join(
    left: &FeatureTable,
    right: &FeatureTable,
    key: &str,
) -> Result<FeatureTable, DataError> {
    left.require_column("left table", key)?;
    right.require_column("right table", key)?;

    // Index right rows by key text for one pass over the left side. Null
    // keys never match anything.
    let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, feature) in right.features.iter().enumerate() {
        let value = feature.get(key);
        if !value.is_null() {
            by_key.entry(value.to_string()).or_default().push(index);
        }
    }

    let mut out = FeatureTable::new(left.crs);
    out.columns = left.columns.clone();
    let renamed: Vec<(String, String)> = right
        .columns
        .iter()
        .filter(|c| c.as_str() != key)
        .map(|c| {
            let target = if left.has_column(c) {
                format!("{c}_right")
            } else {
                c.clone()
            };
            (c.clone(), target)
        })
        .collect();
    for (_, target) in &renamed {
        out.register_column(target);
    }

    let mut matched_left = 0usize;
    for feature in &left.features {
        let value = feature.get(key);
        if value.is_null() {
            continue;
        }
        let Some(matches) = by_key.get(&value.to_string()) else {
            continue;
        };

        matched_left += 1;
        for &right_index in matches {
            let right_feature = &right.features[right_index];
            let mut joined = feature.clone();
            for (source, target) in &renamed {
                let value = right_feature
                    .attributes
                    .get(source)
                    .cloned()
                    .unwrap_or(Value::Null);
                joined.attributes.insert(target.clone(), value);
            }
            out.features.push(joined);
        }
    }

    debug!(
        "inner join on `{}`: {} of {} left rows matched, {} rows out",
        key,
        matched_left,
        left.len(),
        out.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Crs, Feature};

    fn table(columns: &[&str], rows: &[&[&str]]) -> FeatureTable {
        let mut table = FeatureTable::new(Crs::Wgs84);
        for c in columns {
            table.register_column(c);
        }
        for row in rows {
            let mut feature = Feature::default();
            for (c, v) in columns.iter().zip(row.iter()) {
                feature.attributes.insert(c.to_string(), Value::parse(v));
            }
            table.features.push(feature);
        }
        table
    }

    #[test]
    fn test_inner_join_cardinality() {
        // Two left rows with key W1, one matching right row: two output
        // rows, each carrying the right-side value.
        let left = table(
            &["ward_code", "population"],
            &[&["W1", "100"], &["W1", "150"], &["W2", "80"]],
        );
        let right = table(&["ward_code", "distance"], &[&["W1", "2.3"]]);

        let joined = inner_join(&left, &right, "ward_code").unwrap();

        assert_eq!(joined.len(), 2);
        for feature in &joined.features {
            assert_eq!(feature.text("ward_code"), Some("W1"));
            assert_eq!(feature.number("distance"), Some(2.3));
        }
    }

    #[test]
    fn test_unmatched_rows_dropped_on_both_sides() {
        let left = table(&["k", "a"], &[&["1", "x"], &["2", "y"]]);
        let right = table(&["k", "b"], &[&["2", "p"], &["3", "q"]]);

        let joined = inner_join(&left, &right, "k").unwrap();

        assert_eq!(joined.len(), 1);
        assert_eq!(joined.features[0].number("k"), Some(2.0));
        assert_eq!(joined.features[0].text("b"), Some("p"));
    }

    #[test]
    fn test_collision_gets_suffix() {
        let left = table(&["k", "name"], &[&["1", "left name"]]);
        let right = table(&["k", "name"], &[&["1", "right name"]]);

        let joined = inner_join(&left, &right, "k").unwrap();

        assert!(joined.has_column("name_right"));
        assert_eq!(joined.features[0].text("name"), Some("left name"));
        assert_eq!(joined.features[0].text("name_right"), Some("right name"));
    }

    #[test]
    fn test_null_keys_never_match() {
        let left = table(&["k", "a"], &[&["", "x"]]);
        let right = table(&["k", "b"], &[&["", "y"]]);
        let joined = inner_join(&left, &right, "k").unwrap();
        assert!(joined.is_empty());
    }

    #[test]
    fn test_missing_key_column_names_table() {
        let left = table(&["k"], &[&["1"]]);
        let right = table(&["other"], &[&["1"]]);
        let err = inner_join(&left, &right, "k").unwrap_err();
        assert!(err.to_string().contains("right table"));
    }

    #[test]
    fn test_join_preserves_left_geometry() {
        let mut left = table(&["k"], &[&["1"]]);
        left.features[0].geometry = Some(crate::models::Geometry::Point(
            geo_types::Point::new(1.0, 2.0),
        ));
        let right = table(&["k", "v"], &[&["1", "9"]]);

        let joined = inner_join(&left, &right, "k").unwrap();
        assert_eq!(joined.geometry_count(), 1);
    }
}
