//! Scoped file-creation mask

use crate::host::DeviceHost;
use nix::sys::stat::Mode;
use parking_lot::{Mutex, MutexGuard, const_mutex};

// The mask is process-wide; concurrent populations in one process take turns.
static UMASK_LOCK: Mutex<()> = const_mutex(());

/// Holds the process umask at zero until dropped
///
/// New device nodes and symlinks then carry exactly the mode bits copied from
/// the host. The previous mask is restored on every exit path.
#[must_use = "the umask is restored as soon as the guard is dropped"]
pub struct UmaskGuard<'h, H: DeviceHost> {
    host: &'h H,
    previous: Mode,
    _lock: MutexGuard<'static, ()>,
}

impl<'h, H: DeviceHost> UmaskGuard<'h, H> {
    pub fn zero(host: &'h H) -> Self {
        let lock = UMASK_LOCK.lock();
        let previous = host.umask(Mode::empty());
        tracing::trace!(previous = format_args!("{:04o}", previous.bits()), "umask cleared");
        Self {
            host,
            previous,
            _lock: lock,
        }
    }

    #[must_use]
    pub const fn previous(&self) -> Mode {
        self.previous
    }
}

impl<H: DeviceHost> Drop for UmaskGuard<'_, H> {
    fn drop(&mut self) {
        self.host.umask(self.previous);
        tracing::trace!(restored = format_args!("{:04o}", self.previous.bits()), "umask restored");
    }
}

impl<H: DeviceHost> std::fmt::Debug for UmaskGuard<'_, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UmaskGuard")
            .field("previous", &self.previous)
            .finish_non_exhaustive()
    }
}
