//! Logistic-regression pipeline artifact stored as JSON.
//!
//! ```json
//! {
//!   "numeric": [{ "name": "FeedCount", "impute": 12.0, "center": 10.0, "scale": 4.0, "weight": 0.8 }],
//!   "categorical": [{ "name": "PartShapeName", "levels": { "QFP": 1.2, "SOIC": -0.3 } }],
//!   "intercept": -2.5,
//!   "threshold": 0.5
//! }
//! ```
//!
//! Numeric inputs are imputed, centered and scaled before weighting.
//! Categorical inputs are one-hot: the matching level adds its weight, unknown
//! levels add nothing, and a missing value is looked up as `missing_level`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::classifier::{Classifier, FeatureMatrix, FeatureRow, FeatureSchema};
use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStep {
    pub name: String,
    #[serde(default)]
    pub impute: f64,
    #[serde(default)]
    pub center: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalStep {
    pub name: String,
    #[serde(default)]
    pub levels: BTreeMap<String, f64>,
    #[serde(default = "default_missing_level")]
    pub missing_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticPipeline {
    #[serde(default)]
    numeric: Vec<NumericStep>,
    #[serde(default)]
    categorical: Vec<CategoricalStep>,
    #[serde(default)]
    intercept: f64,
    #[serde(default = "default_threshold")]
    threshold: f64,
    #[serde(skip)]
    schema: FeatureSchema,
}

fn default_scale() -> f64 {
    1.0
}

fn default_missing_level() -> String {
    "missing".to_string()
}

fn default_threshold() -> f64 {
    0.5
}

impl LogisticPipeline {
    /// Reads and validates a pipeline artifact.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ModelLoad`] if the file is unreadable, is not a valid
    /// artifact, or its feature schema is unusable.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let load_err = |reason: String| PipelineError::ModelLoad {
            path: path.to_path_buf(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let pipeline = Self::from_json(&content).map_err(|e| load_err(format!("{e:#}")))?;

        info!(
            numeric = pipeline.schema.numeric.len(),
            categorical = pipeline.schema.categorical.len(),
            threshold = pipeline.threshold,
            "Model pipeline loaded"
        );
        Ok(pipeline)
    }

    /// Parses and validates an artifact from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut pipeline: LogisticPipeline = serde_json::from_str(json)?;
        pipeline.validate()?;
        pipeline.schema = FeatureSchema {
            numeric: pipeline.numeric.iter().map(|s| s.name.clone()).collect(),
            categorical: pipeline.categorical.iter().map(|s| s.name.clone()).collect(),
        };
        Ok(pipeline)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn validate(&self) -> Result<()> {
        if self.numeric.is_empty() && self.categorical.is_empty() {
            bail!("artifact declares no input features");
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            bail!("threshold {} is outside (0, 1)", self.threshold);
        }
        if !self.intercept.is_finite() {
            bail!("intercept is not finite");
        }
        for step in &self.numeric {
            if step.scale == 0.0 || !step.scale.is_finite() {
                bail!("feature '{}' has unusable scale {}", step.name, step.scale);
            }
            if !(step.impute.is_finite() && step.center.is_finite() && step.weight.is_finite()) {
                bail!("feature '{}' has non-finite parameters", step.name);
            }
        }
        for step in &self.categorical {
            if let Some((level, _)) = step.levels.iter().find(|(_, w)| !w.is_finite()) {
                bail!("feature '{}' level '{}' has a non-finite weight", step.name, level);
            }
        }
        Ok(())
    }

    fn decision(&self, row: &FeatureRow) -> Result<f64> {
        if row.numeric.len() != self.numeric.len() || row.categorical.len() != self.categorical.len() {
            bail!(
                "row has {}+{} features, model expects {}+{}",
                row.numeric.len(),
                row.categorical.len(),
                self.numeric.len(),
                self.categorical.len()
            );
        }

        let numeric: f64 = self
            .numeric
            .iter()
            .zip(&row.numeric)
            .map(|(step, value)| {
                let x = value.unwrap_or(step.impute);
                step.weight * (x - step.center) / step.scale
            })
            .sum();

        let categorical: f64 = self
            .categorical
            .iter()
            .zip(&row.categorical)
            .map(|(step, value)| {
                let level = value.as_deref().unwrap_or(step.missing_level.as_str());
                step.levels.get(level).copied().unwrap_or(0.0)
            })
            .sum();

        Ok(self.intercept + numeric + categorical)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for LogisticPipeline {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn predict_proba(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        matrix
            .rows
            .iter()
            .map(|row| self.decision(row).map(sigmoid))
            .collect()
    }

    /// Positive when the probability is strictly above the threshold.
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<u8>> {
        Ok(self
            .predict_proba(matrix)?
            .into_iter()
            .map(|p| u8::from(p > self.threshold))
            .collect())
    }
}
