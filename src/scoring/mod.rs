//! Classifier abstraction and batch scoring.
//!
//! [`Classifier`] is the seam for any pre-trained model; [`LogisticPipeline`]
//! is the artifact format shipped with the tool. [`score`] applies a model to
//! a feature matrix and handles the all-negative fallback.

pub mod classifier;
pub mod logistic;
pub mod threshold;

pub use classifier::{Classifier, FeatureMatrix, FeatureRow, FeatureSchema};
pub use logistic::LogisticPipeline;
pub use threshold::{FALLBACK_PERCENTILE, Scores, ScoringSummary, ThresholdSource, score};

/// Column holding the positive-class probability in the scored table.
pub const ERROR_PROBABILITY: &str = "ErrorProbability";

/// Column holding the final 0/1 label in the scored table.
pub const PREDICTED_ERROR: &str = "PredictedError";
