use serde::Serialize;
use tracing::{info, warn};

use super::classifier::{Classifier, FeatureMatrix};
use crate::error::{PipelineError, Result};
use crate::stats::{mean, percentile};

/// Percentile used as the decision threshold when the model flags nothing.
pub const FALLBACK_PERCENTILE: f64 = 95.0;

const DISTRIBUTION_PERCENTILES: [f64; 8] = [0.0, 25.0, 50.0, 75.0, 90.0, 95.0, 99.0, 100.0];

/// Where the active decision threshold came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ThresholdSource {
    /// The classifier's own decision rule.
    Model,
    /// Rows at or above this probability percentile are positive.
    Percentile { percentile: f64, threshold: f64 },
}

/// Per-row scoring output.
#[derive(Debug, Clone, PartialEq)]
pub struct Scores {
    pub probabilities: Vec<f64>,
    pub labels: Vec<u8>,
    pub raw_positives: usize,
    pub threshold: ThresholdSource,
}

/// Scoring facts carried into the result envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringSummary {
    pub threshold: ThresholdSource,
    pub fallback_applied: bool,
    pub raw_positive_count: usize,
    pub predicted_positive_count: usize,
}

impl Scores {
    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }

    pub fn fallback_applied(&self) -> bool {
        matches!(self.threshold, ThresholdSource::Percentile { .. })
    }

    pub fn summary(&self) -> ScoringSummary {
        ScoringSummary {
            threshold: self.threshold,
            fallback_applied: self.fallback_applied(),
            raw_positive_count: self.raw_positives,
            predicted_positive_count: self.positives(),
        }
    }
}

/// Scores every row, falling back to a percentile threshold when the
/// classifier labels the whole batch negative. Probabilities are never altered.
///
/// # Errors
///
/// [`PipelineError::Scoring`] if the classifier fails, returns the wrong
/// number of values, or returns a probability that is non-finite or outside
/// `[0, 1]`.
#[tracing::instrument(skip_all, fields(rows = matrix.len()))]
pub fn score(classifier: &dyn Classifier, matrix: &FeatureMatrix) -> Result<Scores> {
    let probabilities = classifier
        .predict_proba(matrix)
        .map_err(|e| PipelineError::Scoring(format!("probability prediction failed: {e:#}")))?;
    let labels = classifier
        .predict(matrix)
        .map_err(|e| PipelineError::Scoring(format!("label prediction failed: {e:#}")))?;

    if probabilities.len() != matrix.len() || labels.len() != matrix.len() {
        return Err(PipelineError::Scoring(format!(
            "classifier returned {} probabilities and {} labels for {} rows",
            probabilities.len(),
            labels.len(),
            matrix.len()
        )));
    }
    if let Some(row) = probabilities.iter().position(|p| !p.is_finite()) {
        return Err(PipelineError::Scoring(format!(
            "non-finite probability at row {row}"
        )));
    }
    if let Some((row, p)) = probabilities
        .iter()
        .enumerate()
        .find(|(_, p)| !(0.0..=1.0).contains(*p))
    {
        return Err(PipelineError::Scoring(format!(
            "probability {p} at row {row} is outside [0, 1]"
        )));
    }
    let labels: Vec<u8> = labels.into_iter().map(|l| u8::from(l != 0)).collect();

    log_distribution(&probabilities);

    let raw_positives = labels.iter().filter(|&&l| l == 1).count();
    info!(
        raw_positives,
        rate = crate::stats::ratio(raw_positives, labels.len()),
        "Classifier labels computed"
    );

    if raw_positives > 0 {
        return Ok(Scores {
            probabilities,
            labels,
            raw_positives,
            threshold: ThresholdSource::Model,
        });
    }

    let Some(threshold) = percentile(&probabilities, FALLBACK_PERCENTILE) else {
        return Ok(Scores {
            probabilities,
            labels,
            raw_positives,
            threshold: ThresholdSource::Model,
        });
    };

    let labels: Vec<u8> = probabilities
        .iter()
        .map(|&p| u8::from(p >= threshold))
        .collect();
    let scores = Scores {
        probabilities,
        labels,
        raw_positives,
        threshold: ThresholdSource::Percentile {
            percentile: FALLBACK_PERCENTILE,
            threshold,
        },
    };
    warn!(
        threshold,
        positives = scores.positives(),
        "No errors predicted, using percentile threshold"
    );
    Ok(scores)
}

fn log_distribution(probabilities: &[f64]) {
    if probabilities.is_empty() {
        return;
    }
    let min = probabilities.iter().copied().fold(f64::INFINITY, f64::min);
    let max = probabilities.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let quantiles: Vec<f64> = DISTRIBUTION_PERCENTILES
        .iter()
        .filter_map(|&q| percentile(probabilities, q))
        .collect();
    info!(
        min,
        max,
        mean = mean(probabilities),
        quantiles = ?quantiles,
        "Probability distribution"
    );
}
