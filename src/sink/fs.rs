use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use super::ArtifactSink;

/// Writes artifacts below a root directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ArtifactSink for FsSink {
    fn put(&self, name: &str, _content_type: &str, bytes: &[u8]) -> Result<String> {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }

        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;

        debug!(path = %path.display(), bytes = bytes.len(), "Artifact written");
        Ok(path.display().to_string())
    }
}
