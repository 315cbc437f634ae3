//! Real host operations

use super::{DeviceHost, HostEntry};
use nix::mount::{MsFlags, mount};
use nix::sys::stat::{self, Mode, SFlag};
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

/// [`DeviceHost`] backed by the running kernel
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl DeviceHost for SystemHost {
    fn stat(&self, path: &Path) -> nix::Result<HostEntry> {
        let st = stat::stat(path)?;
        Ok(HostEntry::from_raw(st.st_mode, st.st_rdev))
    }

    fn lstat(&self, path: &Path) -> nix::Result<HostEntry> {
        let st = stat::lstat(path)?;
        Ok(HostEntry::from_raw(st.st_mode, st.st_rdev))
    }

    fn read_link(&self, path: &Path) -> std::io::Result<PathBuf> {
        std::fs::read_link(path)
    }

    fn symlink(&self, target: &Path, link: &Path) -> std::io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }

    fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o755)
            .create(path)
    }

    fn mknod(&self, path: &Path, kind: SFlag, perm: Mode, rdev: libc::dev_t) -> nix::Result<()> {
        stat::mknod(path, kind, perm, rdev)
    }

    fn mount_tmpfs(&self, target: &Path, flags: MsFlags, data: Option<&str>) -> nix::Result<()> {
        mount(Some("tmpfs"), target, Some("tmpfs"), flags, data)
    }

    fn remount(&self, target: &Path, flags: MsFlags) -> nix::Result<()> {
        mount(
            None::<&str>,
            target,
            None::<&str>,
            MsFlags::MS_REMOUNT | flags,
            None::<&str>,
        )
    }

    fn umask(&self, mask: Mode) -> Mode {
        stat::umask(mask)
    }
}
