//! Destinations for finished report artifacts.
//!
//! Artifacts are built fully in memory and handed to an [`ArtifactSink`] as
//! bytes. The sink decides where they end up and reports back a location
//! string for the result envelope.

pub mod fs;
pub mod memory;
pub mod s3;

pub use fs::FsSink;
pub use memory::MemorySink;
pub use s3::S3Sink;

/// Stores one named artifact.
pub trait ArtifactSink {
    /// Writes `bytes` under the relative `name` and returns where it went.
    fn put(&self, name: &str, content_type: &str, bytes: &[u8]) -> anyhow::Result<String>;
}
