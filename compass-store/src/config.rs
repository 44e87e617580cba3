//! Configuration for compass-store

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::backend::FileBackend;
use crate::error::StoreError;
use crate::store::StateStore;

/// Default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("student-compass")
}

/// Where durable state lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one JSON file per key
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, StoreError> {
        serde_yaml::from_str(yaml).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Open the file-backed state store this config points at.
    pub fn open(&self) -> Result<StateStore<FileBackend>, StoreError> {
        Ok(StateStore::open(FileBackend::open(&self.data_dir)?))
    }
}
