//! Host filesystem capabilities
//!
//! Everything the preparer and materializer do to the host goes through
//! [`DeviceHost`], so the sequencing and validation logic can run against an
//! in-memory fake in tests:
//! - `system` - the real implementation on top of `nix` and `std::fs`
//! - `fake` - recording in-memory host (tests only)

#[cfg(test)]
pub(crate) mod fake;
mod system;

pub use self::system::SystemHost;

use nix::mount::MsFlags;
use nix::sys::stat::{Mode, SFlag};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Narrow set of privileged filesystem operations
pub trait DeviceHost {
    /// Inspect `path`, following symlinks
    fn stat(&self, path: &Path) -> nix::Result<HostEntry>;

    /// Inspect `path` itself, without following a final symlink
    fn lstat(&self, path: &Path) -> nix::Result<HostEntry>;

    /// Literal target text of the symlink at `path`
    fn read_link(&self, path: &Path) -> std::io::Result<PathBuf>;

    /// Create a symlink at `link` pointing to `target`
    fn symlink(&self, target: &Path, link: &Path) -> std::io::Result<()>;

    /// Create `path` and its missing parents with mode 0755
    fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;

    /// Create a device node
    fn mknod(&self, path: &Path, kind: SFlag, perm: Mode, rdev: libc::dev_t) -> nix::Result<()>;

    /// Mount a fresh tmpfs at `target`
    fn mount_tmpfs(&self, target: &Path, flags: MsFlags, data: Option<&str>) -> nix::Result<()>;

    /// Remount the filesystem at `target` with `flags` (`MS_REMOUNT` is added)
    fn remount(&self, target: &Path, flags: MsFlags) -> nix::Result<()>;

    /// Set the process file-creation mask, returning the previous one
    fn umask(&self, mask: Mode) -> Mode;
}

/// Kind of a filesystem entry, as reported by the `S_IFMT` bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    BlockDevice,
    CharDevice,
    Symlink,
    Directory,
    Regular,
    Fifo,
    Socket,
    Unknown,
}

impl EntryKind {
    #[must_use]
    pub const fn from_mode(mode: libc::mode_t) -> Self {
        match mode & libc::S_IFMT {
            libc::S_IFBLK => Self::BlockDevice,
            libc::S_IFCHR => Self::CharDevice,
            libc::S_IFLNK => Self::Symlink,
            libc::S_IFDIR => Self::Directory,
            libc::S_IFREG => Self::Regular,
            libc::S_IFIFO => Self::Fifo,
            libc::S_IFSOCK => Self::Socket,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn is_device(self) -> bool {
        matches!(self, Self::BlockDevice | Self::CharDevice)
    }

    /// `mknod` type flag for device kinds
    #[must_use]
    pub const fn device_flag(self) -> Option<SFlag> {
        match self {
            Self::BlockDevice => Some(SFlag::S_IFBLK),
            Self::CharDevice => Some(SFlag::S_IFCHR),
            _ => None,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BlockDevice => "block device",
            Self::CharDevice => "char device",
            Self::Symlink => "symlink",
            Self::Directory => "directory",
            Self::Regular => "regular file",
            Self::Fifo => "fifo",
            Self::Socket => "socket",
            Self::Unknown => "unknown file type",
        };
        f.write_str(s)
    }
}

/// What the host reports about one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostEntry {
    pub kind: EntryKind,
    /// Permission bits, including setuid/setgid/sticky
    pub mode: Mode,
    /// Device number, meaningful for device kinds only
    pub rdev: libc::dev_t,
}

impl HostEntry {
    #[must_use]
    pub fn from_raw(st_mode: libc::mode_t, st_rdev: libc::dev_t) -> Self {
        Self {
            kind: EntryKind::from_mode(st_mode),
            mode: Mode::from_bits_truncate(st_mode & 0o7777),
            rdev: st_rdev,
        }
    }

    #[must_use]
    pub fn major(&self) -> u64 {
        nix::sys::stat::major(self.rdev)
    }

    #[must_use]
    pub fn minor(&self) -> u64 {
        nix::sys::stat::minor(self.rdev)
    }
}
