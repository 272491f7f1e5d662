//! Group-by-sum aggregation with min/max reporting.

use crate::models::{AggregateReport, DataError, FeatureTable, GroupTotal, Value};
use std::collections::BTreeMap;

/// Partition rows by the text of `group_col` and sum `value_col` per group.
///
/// Null values contribute zero to their group's sum; a text value in the
/// value column is fatal (it means the caller picked the wrong column, not
/// that the data is dirty in an ignorable way). Rows whose group label is
/// null are skipped. Groups come back in ascending label order, and the
/// min/max scan uses strict comparisons so the first label in that order
/// wins ties.
pub fn sum_by(
    table: &FeatureTable,
    group_col: &str,
    value_col: &str,
) -> Result<AggregateReport, DataError> {
    table.require_column("joined table", group_col)?;
    table.require_column("joined table", value_col)?;

    let mut totals: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for (row, feature) in table.features.iter().enumerate() {
        let label = match feature.get(group_col) {
            Value::Null => continue,
            other => other.to_string(),
        };

        let value = match feature.get(value_col) {
            Value::Number(n) => *n,
            Value::Null => 0.0,
            Value::Text(text) => {
                return Err(DataError::NotNumeric {
                    row,
                    column: value_col.to_string(),
                    value: text.clone(),
                })
            }
        };

        let entry = totals.entry(label).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    let groups: Vec<GroupTotal> = totals
        .into_iter()
        .map(|(label, (total, rows))| GroupTotal { label, total, rows })
        .collect();

    if groups.is_empty() {
        return Err(DataError::EmptyAggregation {
            column: group_col.to_string(),
        });
    }

    let mut min = 0usize;
    let mut max = 0usize;
    for (index, group) in groups.iter().enumerate() {
        if group.total < groups[min].total {
            min = index;
        }
        if group.total > groups[max].total {
            max = index;
        }
    }

    Ok(AggregateReport { groups, min, max })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Crs, Feature};

    fn row(county: &str, population: Value) -> Feature {
        let mut feature = Feature::default();
        feature
            .attributes
            .insert("county".to_string(), Value::from(county));
        feature.attributes.insert("population".to_string(), population);
        feature
    }

    fn table(rows: Vec<Feature>) -> FeatureTable {
        let mut table = FeatureTable::new(Crs::Wgs84);
        table.register_column("county");
        table.register_column("population");
        table.features = rows;
        table
    }

    #[test]
    fn test_groups_sum_their_rows() {
        let table = table(vec![
            row("County X", Value::Number(500.0)),
            row("County X", Value::Number(1500.0)),
            row("County Y", Value::Number(300.0)),
        ]);

        let report = sum_by(&table, "county", "population").unwrap();

        assert_eq!(report.groups.len(), 2);
        let x = &report.groups[0];
        assert_eq!(x.label, "County X");
        assert_eq!(x.total, 2000.0);
        assert_eq!(x.rows, 2);
        assert_eq!(report.grand_total(), 2300.0);
    }

    #[test]
    fn test_min_max_identified() {
        let table = table(vec![
            row("A", Value::Number(10.0)),
            row("B", Value::Number(90.0)),
            row("C", Value::Number(40.0)),
        ]);

        let report = sum_by(&table, "county", "population").unwrap();
        assert_eq!(report.min_group().label, "A");
        assert_eq!(report.max_group().label, "B");
    }

    #[test]
    fn test_tie_break_prefers_first_label_in_order() {
        let table = table(vec![
            row("B", Value::Number(5.0)),
            row("A", Value::Number(5.0)),
            row("C", Value::Number(5.0)),
        ]);

        let report = sum_by(&table, "county", "population").unwrap();
        // All tied: ascending label order makes A the first of both scans.
        assert_eq!(report.min_group().label, "A");
        assert_eq!(report.max_group().label, "A");
    }

    #[test]
    fn test_null_values_count_zero_rows_still_counted() {
        let table = table(vec![
            row("A", Value::Number(7.0)),
            row("A", Value::Null),
        ]);

        let report = sum_by(&table, "county", "population").unwrap();
        assert_eq!(report.groups[0].total, 7.0);
        assert_eq!(report.groups[0].rows, 2);
    }

    #[test]
    fn test_text_value_is_fatal_with_row() {
        let table = table(vec![
            row("A", Value::Number(1.0)),
            row("A", Value::from("lots")),
        ]);

        let err = sum_by(&table, "county", "population").unwrap_err();
        assert!(matches!(err, DataError::NotNumeric { row: 1, .. }));
        assert!(err.to_string().contains("lots"));
    }

    #[test]
    fn test_missing_columns_fail() {
        let table = table(vec![row("A", Value::Number(1.0))]);
        assert!(sum_by(&table, "region", "population").is_err());
        assert!(sum_by(&table, "county", "people").is_err());
    }

    #[test]
    fn test_group_sums_partition_the_total() {
        // Sum of group sums equals the input total when every row lands in
        // exactly one group.
        let rows = vec![
            row("A", Value::Number(1.0)),
            row("B", Value::Number(2.0)),
            row("A", Value::Number(3.0)),
            row("C", Value::Number(4.0)),
        ];
        let input_total: f64 = rows
            .iter()
            .filter_map(|f| f.number("population"))
            .sum();

        let report = sum_by(&table(rows), "county", "population").unwrap();
        assert_eq!(report.grand_total(), input_total);
    }
}
