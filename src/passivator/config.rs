use crate::codec::DEFAULT_COMPRESSION_LEVEL;
use crate::core::{ModuleVersion, PassivationError, Result};
use crate::storage::{DurabilityMode, FileBeanStore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Passivator configuration
///
/// Loadable from JSON; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassivatorConfig {
    /// Beans declared below this version use the legacy frame while failover
    /// is active
    pub structured_threshold: ModuleVersion,

    /// Gzip level, 0 to 9
    pub compression_level: u32,

    /// Whether file store entries are fsynced on commit
    pub durability: DurabilityMode,

    /// Directory for `FileBeanStore::from_config`
    pub store_dir: Option<PathBuf>,
}

impl Default for PassivatorConfig {
    fn default() -> Self {
        Self {
            structured_threshold: ModuleVersion::STRUCTURED,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            durability: DurabilityMode::Sync,
            store_dir: None,
        }
    }
}

impl PassivatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the structured-format threshold
    pub fn structured_threshold(mut self, threshold: ModuleVersion) -> Self {
        self.structured_threshold = threshold;
        self
    }

    /// Set the compression level (clamped to 9)
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    pub fn durability(mut self, durability: DurabilityMode) -> Self {
        self.durability = durability;
        self
    }

    /// Set the file store directory
    pub fn store_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.store_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            PassivationError::Io(format!("read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            PassivationError::Registration(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.compression_level > 9 {
            return Err(PassivationError::Registration(format!(
                "compression level {} is out of range 0..=9",
                self.compression_level
            )));
        }
        Ok(())
    }
}

impl FileBeanStore {
    /// Opens the store at `config.store_dir` with the configured durability.
    pub fn from_config(config: &PassivatorConfig) -> Result<Self> {
        let dir = config.store_dir.as_ref().ok_or_else(|| {
            PassivationError::Registration("store_dir is not configured".to_string())
        })?;
        FileBeanStore::open(dir, config.durability)
    }
}
