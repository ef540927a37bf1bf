//! End-to-end orchestration: load, normalize, join, score, aggregate, emit.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::analyzers::aggregate::aggregate;
use crate::analyzers::types::Aggregates;
use crate::config::PipelineConfig;
use crate::error::{ArtifactWriteError, Result};
use crate::loader::{SetupColumns, load_historical, load_setup};
use crate::output::{ArtifactPlan, Report, emit};
use crate::position::explode_positions;
use crate::reconcile::{JoinReport, left_join, merge_predictions, reconcile};
use crate::scoring::{
    Classifier, ERROR_PROBABILITY, LogisticPipeline, PREDICTED_ERROR, ScoringSummary, score,
};
use crate::sink::ArtifactSink;
use crate::table::{Cell, Table};

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    #[serde(flatten)]
    pub aggregates: Aggregates,
    pub scoring: ScoringSummary,
    pub join: JoinReport,
    /// The scored table, one row per joined setup row.
    pub rows: Table,
    /// Artifact key to stored location, for artifacts that were written.
    pub output_files: BTreeMap<String, String>,
    pub artifact_errors: Vec<ArtifactWriteError>,
}

/// Runs the pipeline with the classifier stored at `config.model_path`.
///
/// # Errors
///
/// Any [`crate::error::PipelineError`]; no artifacts are written when one occurs.
#[tracing::instrument(skip_all, fields(setup = %config.setup_path.display()))]
pub fn run(config: &PipelineConfig, sink: &dyn ArtifactSink) -> Result<ResultEnvelope> {
    let historical = load_historical(&config.historical_path)?;
    let (setup, columns) = load_setup(&config.setup_path)?;
    let model = LogisticPipeline::load(&config.model_path)?;
    process(config, &setup, &columns, &historical, &model, sink)
}

/// Runs the pipeline with a caller-supplied classifier. `config.model_path`
/// is ignored.
#[tracing::instrument(skip_all, fields(setup = %config.setup_path.display()))]
pub fn run_with_classifier(
    config: &PipelineConfig,
    classifier: &dyn Classifier,
    sink: &dyn ArtifactSink,
) -> Result<ResultEnvelope> {
    let historical = load_historical(&config.historical_path)?;
    let (setup, columns) = load_setup(&config.setup_path)?;
    process(config, &setup, &columns, &historical, classifier, sink)
}

fn process(
    config: &PipelineConfig,
    setup: &Table,
    columns: &SetupColumns,
    historical: &Table,
    classifier: &dyn Classifier,
    sink: &dyn ArtifactSink,
) -> Result<ResultEnvelope> {
    let exploded = explode_positions(setup, columns);

    let (joined, join) = left_join(&exploded, historical, &columns.part_number);
    let reconciled = reconcile(joined, classifier.schema());
    let scores = score(classifier, &reconciled.matrix)?;

    let mut table = reconciled.table;
    table.set_column(
        ERROR_PROBABILITY,
        scores.probabilities.iter().map(|&p| Cell::Number(p)).collect(),
    );
    table.set_column(
        PREDICTED_ERROR,
        scores.labels.iter().map(|&l| Cell::Number(f64::from(l))).collect(),
    );

    let aggregates = aggregate(
        &table,
        &columns.part_number,
        &scores.labels,
        reconciled.truth_synthesized,
    );
    let scoring = scores.summary();
    let predictions = merge_predictions(setup, columns, &table);

    let plan = ArtifactPlan::now(&config.file_prefix);
    let report = Report {
        aggregates: &aggregates,
        scoring: &scoring,
        join: Some(&join),
        table: &table,
        predictions: &predictions,
    };
    let emitted = emit(&report, &plan, sink);

    info!(
        rows = table.len(),
        predicted_errors = scoring.predicted_positive_count,
        fallback = scoring.fallback_applied,
        artifacts = emitted.output_files.len(),
        artifact_errors = emitted.errors.len(),
        "Pipeline complete"
    );

    Ok(ResultEnvelope {
        aggregates,
        scoring,
        join,
        rows: table,
        output_files: emitted.output_files,
        artifact_errors: emitted.errors,
    })
}
