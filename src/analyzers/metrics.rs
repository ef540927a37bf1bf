use tracing::{info, warn};

use crate::analyzers::types::ModelPerformance;
use crate::error::MetricsUnavailable;
use crate::reconcile::ERROR_COLUMN;
use crate::stats::{finite_or_zero, ratio};
use crate::table::Table;

/// Preferred ground-truth column.
pub const ACTUAL_ERROR_COLUMN: &str = "ActualError";

/// Picks the ground-truth column: `ActualError`, else `Error` unless that
/// column was filled in by the pipeline rather than read from the inputs.
pub fn truth_column(table: &Table, truth_synthesized: bool) -> Option<&'static str> {
    if table.has_column(ACTUAL_ERROR_COLUMN) {
        Some(ACTUAL_ERROR_COLUMN)
    } else if table.has_column(ERROR_COLUMN) && !truth_synthesized {
        Some(ERROR_COLUMN)
    } else {
        None
    }
}

/// Scores `labels` against the truth column. Rows with a missing truth value
/// are left out; truth is binarized as `value > 0`. Never fails: when no
/// usable truth exists the scores are zero and `note` says why.
pub fn model_performance(table: &Table, labels: &[u8], truth_synthesized: bool) -> ModelPerformance {
    let total_errors = labels.iter().filter(|&&l| l == 1).count();
    let mut perf = ModelPerformance {
        total_samples: labels.len(),
        total_errors,
        error_rate: ratio(total_errors, labels.len()),
        ..Default::default()
    };

    let Some(column) = truth_column(table, truth_synthesized) else {
        let reason = MetricsUnavailable::NoTruthColumn;
        warn!(%reason, "Metrics unavailable");
        perf.note = Some(reason.to_string());
        return perf;
    };
    perf.truth_column = Some(column.to_string());

    let (mut tp, mut tn, mut fp, mut fn_) = (0usize, 0usize, 0usize, 0usize);
    let mut missing = 0usize;
    if let Some(idx) = table.column_index(column) {
        for (cell, &pred) in table.column(idx).zip(labels) {
            let Some(truth) = cell.as_f64() else {
                missing += 1;
                continue;
            };
            match (truth > 0.0, pred == 1) {
                (true, true) => tp += 1,
                (false, false) => tn += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
            }
        }
    }

    let valid = tp + tn + fp + fn_;
    perf.nan_samples = missing;
    perf.valid_samples = valid;
    if missing > 0 {
        warn!(column, missing, valid, "Missing truth values excluded from metrics");
    }
    if valid == 0 {
        let reason = MetricsUnavailable::NoValidTruth {
            column: column.to_string(),
        };
        warn!(%reason, "Metrics unavailable");
        perf.note = Some(reason.to_string());
        return perf;
    }

    perf.accuracy = ratio(tp + tn, valid);
    perf.precision = ratio(tp, tp + fp);
    perf.recall = ratio(tp, tp + fn_);
    perf.f1_score = finite_or_zero(ratio(2 * tp, 2 * tp + fp + fn_));

    info!(
        column,
        accuracy = perf.accuracy,
        precision = perf.precision,
        recall = perf.recall,
        f1 = perf.f1_score,
        "Performance metrics computed"
    );
    perf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn truth_table(column: &str, values: &[Cell]) -> Table {
        let mut t = Table::new(vec![column.to_string()]);
        for v in values {
            t.push_row(vec![v.clone()]);
        }
        t
    }

    #[test]
    fn test_confusion_metrics() {
        let t = truth_table(
            "Error",
            &[Cell::Number(1.0), Cell::Number(3.0), Cell::Number(0.0), Cell::Number(0.0)],
        );
        let perf = model_performance(&t, &[1, 0, 1, 0], false);
        assert_eq!(perf.accuracy, 0.5);
        assert_eq!(perf.precision, 0.5);
        assert_eq!(perf.recall, 0.5);
        assert_eq!(perf.f1_score, 0.5);
        assert_eq!(perf.valid_samples, 4);
        assert_eq!(perf.total_errors, 2);
        assert_eq!(perf.error_rate, 0.5);
        assert!(perf.note.is_none());
    }

    #[test]
    fn test_actual_error_preferred() {
        let mut t = truth_table("Error", &[Cell::Number(1.0)]);
        t.set_column(ACTUAL_ERROR_COLUMN, vec![Cell::Number(0.0)]);
        let perf = model_performance(&t, &[0], false);
        assert_eq!(perf.truth_column.as_deref(), Some("ActualError"));
        assert_eq!(perf.accuracy, 1.0);
    }

    #[test]
    fn test_synthesized_truth_gives_note() {
        let t = truth_table("Error", &[Cell::Number(0.0), Cell::Number(0.0)]);
        let perf = model_performance(&t, &[1, 0], true);
        assert_eq!(perf.accuracy, 0.0);
        assert_eq!(perf.f1_score, 0.0);
        assert!(perf.note.as_deref().unwrap().contains("No error truth labels"));
        assert_eq!(perf.total_errors, 1);
        assert_eq!(perf.total_samples, 2);
    }

    #[test]
    fn test_missing_truth_values_excluded() {
        let t = truth_table("Error", &[Cell::Null, Cell::Number(1.0), Cell::Text("n/a?".into())]);
        let perf = model_performance(&t, &[1, 1, 0], false);
        assert_eq!(perf.nan_samples, 2);
        assert_eq!(perf.valid_samples, 1);
        assert_eq!(perf.accuracy, 1.0);
    }

    #[test]
    fn test_all_truth_missing_gives_note() {
        let t = truth_table("ActualError", &[Cell::Null, Cell::Null]);
        let perf = model_performance(&t, &[0, 1], false);
        assert_eq!(perf.accuracy, 0.0);
        assert!(perf.note.is_some());
    }

    #[test]
    fn test_zero_division_yields_zero() {
        let t = truth_table("Error", &[Cell::Number(0.0), Cell::Number(0.0)]);
        let perf = model_performance(&t, &[0, 0], false);
        assert_eq!(perf.accuracy, 1.0);
        assert_eq!(perf.precision, 0.0);
        assert_eq!(perf.recall, 0.0);
        assert_eq!(perf.f1_score, 0.0);
    }
}
