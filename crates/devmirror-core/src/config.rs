//! Device directory configuration

use crate::{DevMirrorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for one device directory population
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevConfig {
    /// Where host device entries are read from
    pub host_root: PathBuf,

    /// Sandbox device root; absent means the feature is disabled
    pub target_root: PathBuf,

    /// Device names relative to both roots, processed in order
    pub devices: Vec<String>,

    /// tmpfs size limit in bytes (kernel default when unset)
    pub tmpfs_size: Option<u64>,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            host_root: PathBuf::from("/dev"),
            target_root: default_target_root(),
            devices: vec![],
            tmpfs_size: None,
        }
    }
}

impl DevConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> DevConfigBuilder {
        DevConfigBuilder::default()
    }

    /// Load a JSON config file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DevMirrorError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            DevMirrorError::Config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Set the tmpfs size limit in KiB, rejecting values that overflow bytes
    pub fn set_tmpfs_size_kb(&mut self, kb: u64) -> Result<()> {
        let bytes = kb.checked_mul(1024).ok_or_else(|| {
            DevMirrorError::Config(format!("tmpfs size of {kb} KiB overflows"))
        })?;
        self.tmpfs_size = Some(bytes);
        Ok(())
    }

    /// tmpfs mount data, e.g. `size=64k`
    #[must_use]
    pub fn mount_data(&self) -> Option<String> {
        self.tmpfs_size
            .map(|bytes| format!("size={}k", (bytes / 1024).max(1)))
    }
}

/// Builder for DevConfig
#[derive(Debug, Default)]
pub struct DevConfigBuilder {
    config: DevConfig,
}

impl DevConfigBuilder {
    #[must_use]
    pub fn host_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.host_root = path.into();
        self
    }

    #[must_use]
    pub fn target_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.target_root = path.into();
        self
    }

    #[must_use]
    pub fn device(mut self, name: impl Into<String>) -> Self {
        self.config.devices.push(name.into());
        self
    }

    #[must_use]
    pub fn devices<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.devices.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn tmpfs_size(mut self, bytes: u64) -> Self {
        self.config.tmpfs_size = Some(bytes);
        self
    }

    /// Size limit in KiB; saturates at `u64::MAX` bytes
    #[must_use]
    pub fn tmpfs_size_kb(self, kb: u64) -> Self {
        self.tmpfs_size(kb.saturating_mul(1024))
    }

    #[must_use]
    pub fn build(self) -> DevConfig {
        self.config
    }
}

/// Get default target root from DEVMIRROR_TARGET env var or system default
///
/// Returns:
/// - `$DEVMIRROR_TARGET` if set (for development)
/// - `/srv/dev` otherwise (production)
pub fn default_target_root() -> PathBuf {
    std::env::var("DEVMIRROR_TARGET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/srv/dev"))
}
