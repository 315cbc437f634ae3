//! Namespace preparer: mount, then seal, the sandbox device tmpfs

use crate::host::DeviceHost;
use crate::privilege;
use crate::umask::UmaskGuard;
use crate::{DevMirrorError, Result};
use nix::errno::Errno;
use nix::mount::MsFlags;
use std::path::{Path, PathBuf};

/// Flags for the device tmpfs; sealing adds `MS_RDONLY`
pub const DEV_MOUNT_FLAGS: MsFlags = MsFlags::MS_NOSUID
    .union(MsFlags::MS_NOEXEC)
    .union(MsFlags::MS_RELATIME);

/// A mounted, still writable device tmpfs
///
/// The umask stays at zero for as long as this value lives.
#[derive(Debug)]
#[must_use = "an unsealed device root must not be handed to a sandbox"]
pub struct StagedMount<'h, H: DeviceHost> {
    host: &'h H,
    target: PathBuf,
    _umask: UmaskGuard<'h, H>,
}

/// Mount a fresh tmpfs at `target`
///
/// Returns `Ok(None)` when `target` does not exist: the feature is disabled
/// on this host and nothing is mounted.
pub fn begin<'h, H: DeviceHost>(
    host: &'h H,
    target: &Path,
    data: Option<&str>,
) -> Result<Option<StagedMount<'h, H>>> {
    match host.stat(target) {
        Ok(_) => {}
        Err(Errno::ENOENT) => {
            tracing::info!(?target, "device root absent, skipping");
            return Ok(None);
        }
        Err(e) => {
            return Err(DevMirrorError::TargetInspect {
                target: target.to_path_buf(),
                source: e,
            });
        }
    }

    privilege::warn_missing();
    let umask = UmaskGuard::zero(host);

    tracing::debug!(?target, flags = ?DEV_MOUNT_FLAGS, ?data, "mount dev tmpfs");
    host.mount_tmpfs(target, DEV_MOUNT_FLAGS, data)
        .map_err(|e| DevMirrorError::Mount {
            target: target.to_path_buf(),
            source: e,
        })?;

    Ok(Some(StagedMount {
        host,
        target: target.to_path_buf(),
        _umask: umask,
    }))
}

impl<H: DeviceHost> StagedMount<'_, H> {
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Remount read-only, keeping the mount flags; the umask is restored afterwards
    pub fn seal(self) -> Result<()> {
        let flags = DEV_MOUNT_FLAGS | MsFlags::MS_RDONLY;
        tracing::debug!(target = ?self.target, ?flags, "remount dev tmpfs read-only");
        self.host
            .remount(&self.target, flags)
            .map_err(|e| DevMirrorError::Remount {
                target: self.target.clone(),
                source: e,
            })
    }
}
