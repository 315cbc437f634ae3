//! Populate the sandbox device root: prepare, materialize, seal

use crate::config::DevConfig;
use crate::host::{DeviceHost, SystemHost};
use crate::materialize::{DevEntry, Materializer};
use crate::{Result, prepare};

/// Result of a successful population
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountOutcome {
    /// Target root absent; nothing was mounted
    Skipped,
    /// Tmpfs mounted, populated and remounted read-only
    Sealed(Vec<DevEntry>),
}

impl MountOutcome {
    #[must_use]
    pub fn entries(&self) -> &[DevEntry] {
        match self {
            Self::Skipped => &[],
            Self::Sealed(entries) => entries,
        }
    }
}

/// Mount a tmpfs at the target root, copy every configured device into it and
/// remount it read-only.
///
/// Stops at the first device that fails. Nothing is rolled back: on error the
/// tmpfs stays mounted and writable with whatever was created so far, and must
/// not be used.
pub fn mount_dev<H: DeviceHost>(host: &H, config: &DevConfig) -> Result<MountOutcome> {
    let data = config.mount_data();
    let Some(staged) = prepare::begin(host, &config.target_root, data.as_deref())? else {
        return Ok(MountOutcome::Skipped);
    };

    let entries = Materializer::from_config(host, config).copy_all(&config.devices)?;
    staged.seal()?;

    tracing::info!(
        target = ?config.target_root,
        devices = entries.len(),
        "device root sealed"
    );
    Ok(MountOutcome::Sealed(entries))
}

/// [`mount_dev`] on the running host with default roots
pub fn mount_dev_default<S: AsRef<str>>(devices: &[S]) -> Result<MountOutcome> {
    let config = DevConfig::builder()
        .devices(devices.iter().map(|d| d.as_ref().to_owned()))
        .build();
    mount_dev(&SystemHost, &config)
}

/// Dry run: inspect and validate every configured device without mounting or
/// writing anything
pub fn check<H: DeviceHost>(host: &H, config: &DevConfig) -> Result<Vec<DevEntry>> {
    Materializer::from_config(host, config).plan_all(&config.devices)
}
