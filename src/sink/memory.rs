use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{Result, anyhow};

use super::ArtifactSink;

/// Keeps artifacts in memory, keyed by name.
#[derive(Debug, Default)]
pub struct MemorySink {
    artifacts: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.artifacts.lock().ok()?.get(name).cloned()
    }

    /// Names of stored artifacts, sorted.
    pub fn names(&self) -> Vec<String> {
        self.artifacts
            .lock()
            .map(|a| a.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl ArtifactSink for MemorySink {
    fn put(&self, name: &str, _content_type: &str, bytes: &[u8]) -> Result<String> {
        let mut artifacts = self
            .artifacts
            .lock()
            .map_err(|_| anyhow!("artifact store poisoned"))?;
        artifacts.insert(name.to_string(), bytes.to_vec());
        Ok(format!("memory://{name}"))
    }
}
