//! Error types for the feeder risk pipeline.
//!
//! [`PipelineError`] variants are fatal and abort the whole call. The two
//! non-fatal conditions, [`MetricsUnavailable`] and [`ArtifactWriteError`],
//! never escape a pipeline run: they are folded into the result as notes and
//! per-artifact failure records.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal pipeline failures. The message is meant to be shown to operators verbatim.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Identifying columns absent from the feeder setup file.
    #[error("Required columns missing in the feeder setup file: {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    /// Every delimiter strategy failed to produce a table.
    #[error("Could not parse {}: {}", .path.display(), .attempts.join("; "))]
    Parse {
        path: PathBuf,
        attempts: Vec<String>,
    },

    /// Classifier artifact missing or its schema unreadable.
    #[error("Could not load model from {}: {reason}", .path.display())]
    ModelLoad { path: PathBuf, reason: String },

    /// Classifier produced unusable output.
    #[error("Scoring failed: {0}")]
    Scoring(String),

    #[error("Could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Why performance metrics could not be computed. Rendered into the metrics note.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricsUnavailable {
    #[error("No error truth labels available in feeder setup for performance scoring.")]
    NoTruthColumn,

    #[error("Error calculating metrics: no valid values in {column} column after removing missing values")]
    NoValidTruth { column: String },
}

/// A single output artifact that could not be produced.
#[derive(Error, Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[error("Failed to write {artifact} artifact: {reason}")]
pub struct ArtifactWriteError {
    pub artifact: String,
    pub reason: String,
}
