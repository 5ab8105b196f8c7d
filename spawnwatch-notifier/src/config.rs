//! Notifier configuration, loaded from a TOML file.

use serde::{Deserialize, Serialize};
use spawnwatch_core::common::error::{NotifierError, Result};
use std::path::{Path, PathBuf};

/// Which subscription store implementation the binary wires up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Database,
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::Memory
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Catalog JSON file, or directory of JSON files.
    pub catalog_path: PathBuf,
    #[serde(default)]
    pub storage: StorageBackend,
    /// Classifier confidence gate, in percent. Applied by the spawn entry
    /// point before resolution; the resolver itself never sees confidences.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

fn default_min_confidence() -> f64 {
    70.0
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("catalog"),
            storage: StorageBackend::default(),
            min_confidence: default_min_confidence(),
        }
    }
}

impl NotifierConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| NotifierError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| NotifierError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Load the config file if it exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}
