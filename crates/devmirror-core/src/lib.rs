//! # devmirror-core
//!
//! Private, read-only `/dev` views for sandboxed processes.
//!
//! This crate mounts a fresh tmpfs at the sandbox device root and copies an
//! allowlist of host device entries into it:
//! - block and character devices are recreated with `mknod` (same type, mode,
//!   major and minor)
//! - absolute symlinks are copied verbatim and resolved later, inside the sandbox
//! - anything else aborts the whole batch
//!
//! Once populated the tmpfs is remounted read-only.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod devdir;
pub mod error;
pub mod host;
pub mod materialize;
pub mod prepare;
pub mod privilege;
pub mod umask;

pub use config::DevConfig;
pub use devdir::{MountOutcome, check, mount_dev, mount_dev_default};
pub use error::{CopyError, DevMirrorError};
pub use host::{DeviceHost, EntryKind, HostEntry, SystemHost};
pub use materialize::{DevEntry, EntrySpec, Materializer};

/// Crate-level result type
pub type Result<T> = std::result::Result<T, DevMirrorError>;
