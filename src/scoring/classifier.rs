use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Input columns a classifier declares, in the order it expects them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl FeatureSchema {
    /// Numeric names followed by categorical names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.numeric
            .iter()
            .chain(self.categorical.iter())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.numeric.len() + self.categorical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One row of classifier input. Missing values are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    pub numeric: Vec<Option<f64>>,
    pub categorical: Vec<Option<String>>,
}

/// Rows laid out in [`FeatureSchema`] order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    pub rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A pre-trained binary classifier consumed as an opaque scorer.
///
/// Implementations describe their own inputs through [`Classifier::schema`];
/// the pipeline never hardcodes feature names.
pub trait Classifier {
    fn schema(&self) -> &FeatureSchema;

    /// Probability of the positive class for every row.
    fn predict_proba(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>>;

    /// The model's own 0/1 decision for every row.
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<u8>>;
}
