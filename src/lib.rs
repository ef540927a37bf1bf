pub mod analyzers;
pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod position;
pub mod reconcile;
pub mod scoring;
pub mod sink;
pub mod stats;
pub mod table;
