//! Report statistics over a scored feeder setup.
//!
//! Metrics against ground truth, dataset summary counts, and per-dimension
//! error breakdowns. Nothing here fails: missing inputs degrade to empty
//! groups or zeroed metrics with a note.

pub mod aggregate;
pub mod breakdown;
pub mod metrics;
pub mod summary;
pub mod types;
