//! Configuration module

use crate::{Result, StorageError};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for storage helper operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Size of the upload buffer in bytes (default: 8MB)
    pub write_buffer_size: usize,
    /// Whether to use multipart upload for large objects (default: true)
    ///
    /// When disabled every upload is held in memory until it is committed
    /// with a single PUT, whatever its size.
    pub use_multipart_upload: bool,
    /// Bytes held back before switching to multipart upload (default: one buffer)
    ///
    /// Upload memory stays below `multipart_threshold + write_buffer_size`.
    pub multipart_threshold: usize,
    /// Deadline for a whole prefix listing, in seconds (default: 10)
    pub list_timeout_secs: u64,
    /// Worker threads of the helper's runtime (default: 2)
    pub worker_threads: usize,
    /// Content type attached to text uploads
    pub text_content_type: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            write_buffer_size: 8 * 1024 * 1024,    // 8MB
            use_multipart_upload: true,
            multipart_threshold: 8 * 1024 * 1024,  // 8MB
            list_timeout_secs: 10,
            worker_threads: 2,
            text_content_type: "text/plain".to_string(),
        }
    }
}

impl StorageConfig {
    /// Deadline applied to prefix listings
    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }

    /// Reject settings the helper cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.write_buffer_size == 0 {
            return Err(StorageError::Config(
                "write_buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.worker_threads == 0 {
            return Err(StorageError::Config(
                "worker_threads must be greater than zero".to_string(),
            ));
        }
        if self.use_multipart_upload && self.multipart_threshold < self.write_buffer_size {
            return Err(StorageError::Config(format!(
                "multipart_threshold ({}) is smaller than write_buffer_size ({})",
                self.multipart_threshold, self.write_buffer_size
            )));
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: StorageConfig = toml::from_str(contents)
            .map_err(|e| StorageError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the given file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            StorageError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir().ok_or_else(|| {
            StorageError::Config("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join("beppo").join("config.toml"))
    }

    /// Load the default configuration file, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| StorageError::Config(format!("Failed to serialize config: {}", e)))
    }
}
