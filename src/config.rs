//! Runtime configuration for library callers and the CLI.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

pub const DEFAULT_HISTORICAL_PATH: &str = "PartUsage.csv";
pub const DEFAULT_MODEL_PATH: &str = "feeder_model.json";
pub const DEFAULT_FILE_PREFIX: &str = "predictions_output";
pub const DEFAULT_LOG_FILE_PATH: &str = "logs/feeder_risk.log";

/// Inputs of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub setup_path: PathBuf,
    pub historical_path: PathBuf,
    pub model_path: PathBuf,
    /// Prefix of the artifact folder and report file names.
    pub file_prefix: String,
}

impl PipelineConfig {
    /// Config for `setup_path` with the historical data, model and prefix defaults.
    pub fn new(setup_path: impl Into<PathBuf>) -> Self {
        Self {
            setup_path: setup_path.into(),
            historical_path: PathBuf::from(DEFAULT_HISTORICAL_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
        }
    }

    pub fn with_historical(mut self, path: impl Into<PathBuf>) -> Self {
        self.historical_path = path.into();
        self
    }

    pub fn with_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }
}

/// Where the JSON log file goes. Read from `LOG_FILE_PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub file_path: PathBuf,
}

impl LogConfig {
    pub fn from_env() -> Self {
        let file_path = std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_FILE_PATH.to_string());
        Self {
            file_path: PathBuf::from(file_path),
        }
    }

    pub fn dir(&self) -> &Path {
        match self.file_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("logs"),
        }
    }

    pub fn file_name(&self) -> &OsStr {
        self.file_path
            .file_name()
            .unwrap_or(OsStr::new("feeder_risk.log"))
    }
}
