//! Error types for devmirror-core

use crate::host::EntryKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DevMirrorError {
    #[error("mount dev tmpfs at {}: {source}", target.display())]
    Mount { target: PathBuf, source: nix::Error },

    #[error("remount dev tmpfs read-only at {}: {source}", target.display())]
    Remount { target: PathBuf, source: nix::Error },

    #[error("stat {}: {source}", target.display())]
    TargetInspect { target: PathBuf, source: nix::Error },

    #[error("copy dev {name}: {source}")]
    Copy {
        name: String,
        #[source]
        source: CopyError,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Failure while copying a single device, tagged with the stage that failed
#[derive(Error, Debug)]
pub enum CopyError {
    #[error("invalid device name: {reason}")]
    InvalidName { reason: &'static str },

    #[error("statx {}: {source}", path.display())]
    Inspect { path: PathBuf, source: nix::Error },

    #[error("statx-nofollow {}: {source}", path.display())]
    InspectNoFollow { path: PathBuf, source: nix::Error },

    #[error("not block or char device: {} is {kind}", path.display())]
    NotADevice { path: PathBuf, kind: EntryKind },

    #[error("readlink {}: {source}", path.display())]
    ReadLink {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("non-absolute symlink: {} -> {}", path.display(), target.display())]
    NonAbsoluteSymlink { path: PathBuf, target: PathBuf },

    #[error("symlink {} -> {}: {source}", path.display(), target.display())]
    SymlinkCreate {
        path: PathBuf,
        target: PathBuf,
        source: std::io::Error,
    },

    #[error("mkdir {}: {source}", path.display())]
    Mkdir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("mknod {}: {source}", path.display())]
    Mknod { path: PathBuf, source: nix::Error },
}

impl CopyError {
    /// Short label of the step that failed
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::InvalidName { .. } => "validate",
            Self::Inspect { .. } | Self::InspectNoFollow { .. } => "inspect",
            Self::NotADevice { .. } => "type-check",
            Self::ReadLink { .. } | Self::NonAbsoluteSymlink { .. } => "symlink-read",
            Self::SymlinkCreate { .. } => "symlink-create",
            Self::Mkdir { .. } => "mkdir",
            Self::Mknod { .. } => "mknod",
        }
    }
}

impl DevMirrorError {
    /// The per-device failure, if this error came from copying a device
    #[must_use]
    pub const fn copy_error(&self) -> Option<(&String, &CopyError)> {
        match self {
            Self::Copy { name, source } => Some((name, source)),
            _ => None,
        }
    }
}
