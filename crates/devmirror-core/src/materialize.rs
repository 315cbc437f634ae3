//! Device materializer
//!
//! Reproduces one host device entry inside the sandbox device root:
//! 1. stat the host entry (following symlinks) and require a block or char device
//! 2. lstat it to learn whether the entry itself is a symlink
//! 3. symlinks must be absolute and are copied verbatim, unresolved
//! 4. real device nodes are recreated with `mknod`

use crate::config::DevConfig;
use crate::error::CopyError;
use crate::host::{DeviceHost, EntryKind};
use crate::{DevMirrorError, Result};
use nix::sys::stat::{Mode, makedev};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// What a device name turns into inside the sandbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EntrySpec {
    /// Device node with the host's type, permission bits and numbers
    Node {
        kind: EntryKind,
        mode: u32,
        major: u64,
        minor: u64,
    },
    /// Symlink carrying the host's literal absolute target
    Symlink { target: PathBuf },
}

/// One device, resolved against both roots
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DevEntry {
    pub name: String,
    pub source: PathBuf,
    pub dest: PathBuf,
    #[serde(flatten)]
    pub spec: EntrySpec,
}

/// Copies host device entries into the sandbox device root
#[derive(Debug)]
pub struct Materializer<'h, H: DeviceHost> {
    host: &'h H,
    host_root: PathBuf,
    target_root: PathBuf,
}

impl<'h, H: DeviceHost> Materializer<'h, H> {
    pub fn new(host: &'h H, host_root: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        Self {
            host,
            host_root: host_root.into(),
            target_root: target_root.into(),
        }
    }

    pub fn from_config(host: &'h H, config: &DevConfig) -> Self {
        Self::new(host, &config.host_root, &config.target_root)
    }

    /// Inspect and validate `name` without touching the sandbox root
    pub fn plan(&self, name: &str) -> std::result::Result<DevEntry, CopyError> {
        validate_name(name)?;
        let source = self.host_root.join(name);
        let dest = self.target_root.join(name);

        let resolved = self.host.stat(&source).map_err(|e| CopyError::Inspect {
            path: source.clone(),
            source: e,
        })?;
        if !resolved.kind.is_device() {
            return Err(CopyError::NotADevice {
                path: source,
                kind: resolved.kind,
            });
        }

        let entry = self.host.lstat(&source).map_err(|e| CopyError::InspectNoFollow {
            path: source.clone(),
            source: e,
        })?;

        let spec = if entry.kind == EntryKind::Symlink {
            let target = self.host.read_link(&source).map_err(|e| CopyError::ReadLink {
                path: source.clone(),
                source: e,
            })?;
            if !target.is_absolute() {
                return Err(CopyError::NonAbsoluteSymlink {
                    path: source,
                    target,
                });
            }
            EntrySpec::Symlink { target }
        } else {
            // lstat saw a non-symlink and stat saw a device: same inode
            EntrySpec::Node {
                kind: entry.kind,
                mode: entry.mode.bits(),
                major: entry.major(),
                minor: entry.minor(),
            }
        };

        Ok(DevEntry {
            name: name.to_owned(),
            source,
            dest,
            spec,
        })
    }

    /// Copy a single device into the sandbox root
    pub fn copy(&self, name: &str) -> std::result::Result<DevEntry, CopyError> {
        let entry = self.plan(name)?;
        self.ensure_parent(&entry.dest)?;

        match &entry.spec {
            EntrySpec::Symlink { target } => {
                tracing::debug!(src = ?entry.source, dst = ?entry.dest, ?target, "symlink");
                self.host
                    .symlink(target, &entry.dest)
                    .map_err(|e| CopyError::SymlinkCreate {
                        path: entry.dest.clone(),
                        target: target.clone(),
                        source: e,
                    })?;
            }
            EntrySpec::Node {
                kind,
                mode,
                major,
                minor,
            } => {
                tracing::debug!(
                    src = ?entry.source,
                    dst = ?entry.dest,
                    %kind,
                    mode = format_args!("{mode:04o}"),
                    major,
                    minor,
                    "mknod"
                );
                let Some(flag) = kind.device_flag() else {
                    return Err(CopyError::NotADevice {
                        path: entry.source.clone(),
                        kind: *kind,
                    });
                };
                self.host
                    .mknod(
                        &entry.dest,
                        flag,
                        Mode::from_bits_truncate(*mode),
                        makedev(*major, *minor),
                    )
                    .map_err(|e| CopyError::Mknod {
                        path: entry.dest.clone(),
                        source: e,
                    })?;
            }
        }

        Ok(entry)
    }

    /// Copy every device in order, stopping at the first failure
    pub fn copy_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<DevEntry>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.copy(name).map_err(|source| DevMirrorError::Copy {
                    name: name.to_owned(),
                    source,
                })
            })
            .collect()
    }

    /// Plan every device in order, stopping at the first failure
    pub fn plan_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<DevEntry>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.plan(name).map_err(|source| DevMirrorError::Copy {
                    name: name.to_owned(),
                    source,
                })
            })
            .collect()
    }

    fn ensure_parent(&self, dest: &Path) -> std::result::Result<(), CopyError> {
        match dest.parent() {
            Some(parent) if parent != self.target_root => {
                self.host.create_dir_all(parent).map_err(|e| CopyError::Mkdir {
                    path: parent.to_path_buf(),
                    source: e,
                })
            }
            _ => Ok(()),
        }
    }
}

fn validate_name(name: &str) -> std::result::Result<(), CopyError> {
    if name.is_empty() {
        return Err(CopyError::InvalidName { reason: "empty name" });
    }
    for component in Path::new(name).components() {
        match component {
            Component::RootDir | Component::Prefix(_) => {
                return Err(CopyError::InvalidName {
                    reason: "absolute path",
                });
            }
            Component::ParentDir => {
                return Err(CopyError::InvalidName {
                    reason: "parent directory component",
                });
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }
    Ok(())
}
