use std::collections::{BTreeMap, HashSet};

use crate::analyzers::types::Summary;
use crate::position::POSITION_COLUMN;
use crate::stats::ratio;
use crate::table::Table;

/// Shape column names, most specific first.
pub const SHAPE_COLUMNS: [&str; 2] = ["PartShapeName", "Shape"];
pub const PACKAGE_COLUMN: &str = "PackageName";
const PACKAGE_TYPE_COLUMN: &str = "PackageType";
const TAPE_WIDTH_COLUMN: &str = "TapeWidth";
const FEEDER_TYPE_COLUMN: &str = "FeederType";

pub fn shape_column(table: &Table) -> Option<&'static str> {
    SHAPE_COLUMNS.into_iter().find(|c| table.has_column(c))
}

/// Non-null key strings of a column, or nothing if the column is absent.
fn keys(table: &Table, column: &str) -> Vec<String> {
    table
        .column_index(column)
        .map(|i| table.column(i).filter_map(|c| c.key()).collect())
        .unwrap_or_default()
}

fn value_counts(values: &[String]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for v in values {
        *counts.entry(v.clone()).or_insert(0) += 1;
    }
    counts
}

/// Most frequent value; ties go to the lexicographically smallest.
fn mode(values: &[String]) -> Option<String> {
    value_counts(values)
        .into_iter()
        .fold(None, |best: Option<(String, usize)>, (k, n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((k, n)),
        })
        .map(|(k, _)| k)
}

fn unique(values: &[String]) -> usize {
    values.iter().collect::<HashSet<_>>().len()
}

/// Value frequencies as fractions of the non-null values.
fn distribution(values: &[String]) -> BTreeMap<String, f64> {
    value_counts(values)
        .into_iter()
        .map(|(k, n)| (k, ratio(n, values.len())))
        .collect()
}

/// Counts and distributions describing the scored setup.
pub fn summarize(table: &Table, part_column: &str) -> Summary {
    let parts = keys(table, part_column);
    let positions = keys(table, POSITION_COLUMN);

    let mut per_feeder: BTreeMap<String, usize> = BTreeMap::new();
    if let (Some(pos), Some(part)) = (table.column_index(POSITION_COLUMN), table.column_index(part_column)) {
        for row in table.rows() {
            if let Some(p) = row[pos].key() {
                let entry = per_feeder.entry(p).or_insert(0);
                if !row[part].is_null() {
                    *entry += 1;
                }
            }
        }
    }

    let shapes = shape_column(table).map(|c| keys(table, c)).unwrap_or_default();
    let packages = keys(table, PACKAGE_COLUMN);

    Summary {
        total_parts: table.len(),
        unique_part_numbers: unique(&parts),
        unique_feeder_ids: unique(&positions),
        most_used_feeder_id: mode(&positions),
        part_number_count_per_feeder: per_feeder,
        unique_shapes: unique(&shapes),
        shape_distribution: distribution(&shapes),
        most_common_shape: mode(&shapes),
        unique_package_names: unique(&packages),
        most_common_package: mode(&packages),
        package_type_distribution: distribution(&keys(table, PACKAGE_TYPE_COLUMN)),
        tape_width_distribution: distribution(&keys(table, TAPE_WIDTH_COLUMN)),
        feeder_type_distribution: distribution(&keys(table, FEEDER_TYPE_COLUMN)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn sample() -> Table {
        let mut t = Table::new(vec![
            "PartNumber".into(),
            "Position".into(),
            "Shape".into(),
            "TapeWidth".into(),
        ]);
        for (part, pos, shape, width) in [
            ("P1", "M1-1", "QFP", "8"),
            ("P2", "M1-1", "QFP", "8"),
            ("P1", "M1-2", "SOIC", "12"),
            ("P3", "M2-1", "", "8"),
        ] {
            t.push_row(vec![Cell::parse(part), Cell::parse(pos), Cell::parse(shape), Cell::parse(width)]);
        }
        t
    }

    #[test]
    fn test_counts() {
        let s = summarize(&sample(), "PartNumber");
        assert_eq!(s.total_parts, 4);
        assert_eq!(s.unique_part_numbers, 3);
        assert_eq!(s.unique_feeder_ids, 3);
        assert_eq!(s.most_used_feeder_id.as_deref(), Some("M1-1"));
        assert_eq!(s.part_number_count_per_feeder["M1-1"], 2);
    }

    #[test]
    fn test_shape_distribution_ignores_nulls() {
        let s = summarize(&sample(), "PartNumber");
        assert_eq!(s.unique_shapes, 2);
        assert_eq!(s.most_common_shape.as_deref(), Some("QFP"));
        assert!((s.shape_distribution["QFP"] - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(s.tape_width_distribution["8"], 0.75);
    }

    #[test]
    fn test_absent_columns_are_empty() {
        let s = summarize(&sample(), "PartNumber");
        assert_eq!(s.unique_package_names, 0);
        assert!(s.most_common_package.is_none());
        assert!(s.feeder_type_distribution.is_empty());
    }

    #[test]
    fn test_mode_tie_picks_smallest() {
        let values = vec!["b".to_string(), "a".to_string(), "b".to_string(), "a".to_string()];
        assert_eq!(mode(&values).as_deref(), Some("a"));
        assert_eq!(mode(&[]), None);
    }
}
