//! Joins setup rows with historical features and prepares classifier input.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{info, warn};

use crate::loader::SetupColumns;
use crate::position::{POSITION_COLUMN, normalize};
use crate::scoring::{ERROR_PROBABILITY, FeatureMatrix, FeatureRow, FeatureSchema, PREDICTED_ERROR};
use crate::table::{Cell, Table};

/// Raw error count column; also the fallback ground truth.
pub const ERROR_COLUMN: &str = "Error";
/// Binary `Error > 0` indicator.
pub const HAS_ERROR_COLUMN: &str = "HasError";

/// Key overlap figures gathered while joining.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinReport {
    pub setup_keys: usize,
    pub historical_keys: usize,
    pub common_keys: usize,
    pub matched_rows: usize,
    pub unmatched_rows: usize,
    pub null_cells: usize,
}

/// Left outer join on `(Position, part number)`.
///
/// Every setup row appears at least once: unmatched rows carry nulls in the
/// historical columns, and a key present several times in `historical`
/// repeats the setup row once per match. Non-key columns present on both
/// sides are suffixed `_x` (setup) and `_y` (historical).
#[tracing::instrument(skip_all, fields(setup_rows = setup.len(), historical_rows = historical.len()))]
pub fn left_join(setup: &Table, historical: &Table, part_column: &str) -> (Table, JoinReport) {
    let setup_pos = setup.column_index(POSITION_COLUMN);
    let setup_part = setup.column_index(part_column);
    let hist_pos = historical.column_index(POSITION_COLUMN);
    let hist_part = historical
        .column_index(part_column)
        .or_else(|| historical.find_column_ci(part_column).and_then(|c| historical.column_index(c)));

    if hist_pos.is_none() || hist_part.is_none() {
        warn!(
            part_column,
            "Historical data lacks join columns, no features will match"
        );
    }

    let hist_cols: Vec<usize> = (0..historical.width())
        .filter(|i| Some(*i) != hist_pos && Some(*i) != hist_part)
        .collect();
    let hist_names: HashSet<&str> = hist_cols
        .iter()
        .map(|&i| historical.columns()[i].as_str())
        .collect();

    let is_key = |i: usize| Some(i) == setup_pos || Some(i) == setup_part;
    let mut names: Vec<String> = setup
        .columns()
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if !is_key(i) && hist_names.contains(c.as_str()) {
                format!("{c}_x")
            } else {
                c.clone()
            }
        })
        .collect();
    let setup_names: HashSet<&str> = setup.columns().iter().map(String::as_str).collect();
    names.extend(hist_cols.iter().map(|&i| {
        let c = &historical.columns()[i];
        if setup_names.contains(c.as_str()) {
            format!("{c}_y")
        } else {
            c.clone()
        }
    }));

    let mut index: HashMap<(String, String), Vec<usize>> = HashMap::new();
    if let (Some(pos), Some(part)) = (hist_pos, hist_part) {
        for (r, row) in historical.rows().iter().enumerate() {
            if let (Some(p), Some(n)) = (row[pos].key(), row[part].key()) {
                index.entry((p, n)).or_default().push(r);
            }
        }
    }

    let key_of = |row: &[Cell]| -> Option<(String, String)> {
        Some((row[setup_pos?].key()?, row[setup_part?].key()?))
    };

    let mut joined = Table::new(names);
    let mut report = JoinReport {
        historical_keys: index.len(),
        ..Default::default()
    };
    let mut setup_keys = HashSet::new();

    for row in setup.rows() {
        let key = key_of(row);
        let matches = key.as_ref().and_then(|k| index.get(k));
        if let Some(k) = key {
            setup_keys.insert(k);
        }

        match matches {
            Some(hits) => {
                report.matched_rows += hits.len();
                for &h in hits {
                    let hist_row = &historical.rows()[h];
                    let mut cells = row.clone();
                    cells.extend(hist_cols.iter().map(|&i| hist_row[i].clone()));
                    joined.push_row(cells);
                }
            }
            None => {
                report.unmatched_rows += 1;
                joined.push_row(row.clone());
            }
        }
    }

    report.setup_keys = setup_keys.len();
    report.common_keys = setup_keys.iter().filter(|k| index.contains_key(*k)).count();
    report.null_cells = joined.null_count();

    info!(
        rows = joined.len(),
        columns = joined.width(),
        setup_keys = report.setup_keys,
        historical_keys = report.historical_keys,
        common_keys = report.common_keys,
        unmatched_rows = report.unmatched_rows,
        null_cells = report.null_cells,
        "Historical features joined"
    );
    (joined, report)
}

/// A joined table made ready for scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub table: Table,
    pub matrix: FeatureMatrix,
    /// Required feature columns that had to be added as all-null.
    pub added_features: Vec<String>,
    /// True when the `Error` column did not come from the inputs.
    pub truth_synthesized: bool,
    pub infinities_replaced: usize,
}

/// Fills in whatever the classifier needs that the join did not provide and
/// extracts the feature matrix in schema order. Never fails.
#[tracing::instrument(skip_all, fields(rows = joined.len(), features = schema.len()))]
pub fn reconcile(mut joined: Table, schema: &FeatureSchema) -> Reconciled {
    let mut added_features = Vec::new();
    for name in schema.names() {
        if !joined.has_column(name) {
            joined.add_column(name, Cell::Null);
            added_features.push(name.to_string());
        }
    }
    if !added_features.is_empty() {
        warn!(missing = ?added_features, "Required features absent, filled with nulls");
    }

    let truth_synthesized = !joined.has_column(ERROR_COLUMN);
    let error_idx = joined.add_column(ERROR_COLUMN, Cell::Number(0.0));
    if !joined.has_column(HAS_ERROR_COLUMN) {
        let has_error: Vec<Cell> = joined
            .column(error_idx)
            .map(|c| Cell::Number(if c.as_f64().is_some_and(|v| v > 0.0) { 1.0 } else { 0.0 }))
            .collect();
        joined.set_column(HAS_ERROR_COLUMN, has_error);
    }

    let numeric_idx: Vec<usize> = schema
        .numeric
        .iter()
        .filter_map(|n| joined.column_index(n))
        .collect();
    let categorical_idx: Vec<usize> = schema
        .categorical
        .iter()
        .filter_map(|n| joined.column_index(n))
        .collect();

    let mut infinities_replaced = 0usize;
    let rows = joined
        .rows()
        .iter()
        .map(|row| FeatureRow {
            numeric: numeric_idx
                .iter()
                .map(|&i| match row[i].as_f64() {
                    Some(v) if v.is_infinite() => {
                        infinities_replaced += 1;
                        None
                    }
                    other => other,
                })
                .collect(),
            categorical: categorical_idx.iter().map(|&i| row[i].key()).collect(),
        })
        .collect();

    if infinities_replaced > 0 {
        warn!(infinities_replaced, "Infinite feature values replaced with nulls");
    }

    Reconciled {
        table: joined,
        matrix: FeatureMatrix { rows },
        added_features,
        truth_synthesized,
        infinities_replaced,
    }
}

/// Puts the scored `ErrorProbability` and `PredictedError` back onto the setup
/// rows as they were loaded, one output row per setup row.
///
/// Rows are matched on `(Position, part number)`. When the setup has no
/// `Position` column it is built from the raw module and location cells
/// without splitting lists, so a multi-valued row finds no match. The first
/// scored row with a key wins; setup rows without a match get `0` in both
/// columns.
#[tracing::instrument(skip_all, fields(setup_rows = setup.len(), scored_rows = scored.len()))]
pub fn merge_predictions(setup: &Table, columns: &SetupColumns, scored: &Table) -> Table {
    let mut out = setup.clone();
    if !out.has_column(POSITION_COLUMN) {
        let module = out.column_index(&columns.module);
        let location = out.column_index(&columns.location);
        let positions = out
            .rows()
            .iter()
            .map(|row| {
                let module = module.map(|i| row[i].display()).unwrap_or_default();
                let location = location.map(|i| row[i].display()).unwrap_or_default();
                Cell::Text(normalize(&module, &location).to_string())
            })
            .collect();
        out.set_column(POSITION_COLUMN, positions);
    }

    let mut scored_by_key: HashMap<(String, String), (Cell, Cell)> = HashMap::new();
    if let (Some(pos), Some(part), Some(prob), Some(label)) = (
        scored.column_index(POSITION_COLUMN),
        scored.column_index(&columns.part_number),
        scored.column_index(ERROR_PROBABILITY),
        scored.column_index(PREDICTED_ERROR),
    ) {
        for row in scored.rows() {
            if let (Some(p), Some(n)) = (row[pos].key(), row[part].key()) {
                scored_by_key
                    .entry((p, n))
                    .or_insert_with(|| (row[prob].clone(), row[label].clone()));
            }
        }
    }

    let pos = out.column_index(POSITION_COLUMN);
    let part = out.column_index(&columns.part_number);
    let zero = || Cell::Number(0.0);
    let mut matched = 0usize;
    let (probabilities, labels): (Vec<Cell>, Vec<Cell>) = out
        .rows()
        .iter()
        .map(|row| {
            let key = pos.zip(part).and_then(|(p, n)| Some((row[p].key()?, row[n].key()?)));
            match key.and_then(|k| scored_by_key.get(&k)) {
                Some((p, l)) => {
                    matched += 1;
                    let or_zero = |c: &Cell| if c.is_null() { zero() } else { c.clone() };
                    (or_zero(p), or_zero(l))
                }
                None => (zero(), zero()),
            }
        })
        .unzip();
    out.set_column(ERROR_PROBABILITY, probabilities);
    out.set_column(PREDICTED_ERROR, labels);

    info!(
        rows = out.len(),
        matched,
        unmatched = out.len() - matched,
        "Predictions merged onto setup rows"
    );
    out
}
