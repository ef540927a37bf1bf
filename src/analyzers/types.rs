//! Data types produced by the aggregation pipeline.

use serde::Serialize;
use std::collections::BTreeMap;

/// Classification metrics against the ground-truth column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelPerformance {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub valid_samples: usize,
    pub total_samples: usize,
    pub nan_samples: usize,
    pub total_errors: usize,
    pub error_rate: f64,
    pub truth_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Dataset-level counts and distributions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_parts: usize,
    pub unique_part_numbers: usize,
    pub unique_feeder_ids: usize,
    pub most_used_feeder_id: Option<String>,
    pub part_number_count_per_feeder: BTreeMap<String, usize>,
    pub unique_shapes: usize,
    pub shape_distribution: BTreeMap<String, f64>,
    pub most_common_shape: Option<String>,
    pub unique_package_names: usize,
    pub most_common_package: Option<String>,
    pub package_type_distribution: BTreeMap<String, f64>,
    pub tape_width_distribution: BTreeMap<String, f64>,
    pub feeder_type_distribution: BTreeMap<String, f64>,
}

/// Grouping dimension for error breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Shape,
    PartNumber,
    Module,
    Package,
}

impl Dimension {
    /// Section title used in reports.
    pub fn title(&self) -> &'static str {
        match self {
            Dimension::Shape => "SHAPE ERRORS",
            Dimension::PartNumber => "PART NUMBER ERRORS",
            Dimension::Module => "MODULE ERRORS",
            Dimension::Package => "PACKAGE ERRORS",
        }
    }
}

/// Error statistics for one group of rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub key: String,
    pub total_count: usize,
    pub error_count: usize,
    pub error_rate: f64,
    /// Share of all predicted errors, in percent.
    pub error_percentage: f64,
}

/// The group with the most predicted errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MostAffected {
    pub name: String,
    pub count: usize,
    /// Share of all predicted errors, as a fraction.
    pub percentage: f64,
}

/// All groups of one dimension, by descending error count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub dimension: Dimension,
    /// Source column the groups were taken from.
    pub column: String,
    pub groups: Vec<GroupStats>,
    pub top: Vec<GroupStats>,
    pub most_affected: Option<MostAffected>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdowns {
    pub shape: Option<Breakdown>,
    pub part_number: Breakdown,
    pub module: Breakdown,
    pub package: Option<Breakdown>,
}

impl Breakdowns {
    /// Present breakdowns in report order.
    pub fn iter(&self) -> impl Iterator<Item = &Breakdown> {
        [
            self.shape.as_ref(),
            Some(&self.part_number),
            self.package.as_ref(),
            Some(&self.module),
        ]
        .into_iter()
        .flatten()
    }
}

/// Predicted-error count for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub key: String,
    pub error_count: usize,
}

/// Everything the aggregation stage computes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregates {
    pub model_performance: ModelPerformance,
    pub summary: Summary,
    pub breakdowns: Breakdowns,
    /// Top part numbers by predicted errors within each module.
    pub module_top_parts: BTreeMap<String, Vec<GroupCount>>,
}
