use tracing::info;

use crate::analyzers::breakdown::{breakdowns, module_top_parts};
use crate::analyzers::metrics::model_performance;
use crate::analyzers::summary::summarize;
use crate::analyzers::types::Aggregates;
use crate::table::Table;

/// Computes every report statistic for a scored table.
///
/// `labels` holds the final 0/1 prediction of each row of `table`. Metrics
/// are computed against the ground-truth column unless `truth_synthesized`
/// says the `Error` column was filled in by the pipeline.
#[tracing::instrument(skip_all, fields(rows = table.len(), part_column = %part_column))]
pub fn aggregate(table: &Table, part_column: &str, labels: &[u8], truth_synthesized: bool) -> Aggregates {
    let model_performance = model_performance(table, labels, truth_synthesized);
    let summary = summarize(table, part_column);
    let breakdowns = breakdowns(table, part_column, labels);
    let module_top_parts = module_top_parts(table, part_column, labels);

    info!(
        total_parts = summary.total_parts,
        total_errors = model_performance.total_errors,
        error_rate = model_performance.error_rate,
        most_affected_part = breakdowns
            .part_number
            .most_affected
            .as_ref()
            .map(|m| m.name.as_str()),
        modules_with_errors = module_top_parts.len(),
        "Aggregation complete"
    );

    Aggregates {
        model_performance,
        summary,
        breakdowns,
        module_top_parts,
    }
}
