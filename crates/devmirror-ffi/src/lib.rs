//! C FFI bindings for devmirror
//!
//! Lets sandbox launchers written in C populate the device root before
//! starting the contained process.
//!
//! # Example (C)
//! ```c
//! #include <devmirror.h>
//!
//! const char *devices[] = {"null", "zero", "urandom", "stdin"};
//! DevmirrorStatus st = devmirror_mount_dev(devices, 4);
//! if (st != DEVMIRROR_STATUS_OK && st != DEVMIRROR_STATUS_SKIPPED) {
//!     fprintf(stderr, "devmirror: %s\n", devmirror_last_error());
//!     exit(1);
//! }
//! ```

#![allow(clippy::missing_safety_doc)]

use devmirror_core::{CopyError, DevConfig, DevMirrorError, MountOutcome, SystemHost};
use libc::{c_char, size_t};
use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::path::PathBuf;
use std::ptr;

/// Status codes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevmirrorStatus {
    /// Device root mounted, populated and sealed
    Ok = 0,
    /// Device root absent, nothing done (not an error)
    Skipped = 1,
    /// Null pointer argument
    NullPointer = 2,
    /// Invalid UTF-8
    InvalidUtf8 = 3,
    /// tmpfs mount failed
    MountFailed = 4,
    /// Read-only remount failed; the device root must not be used
    RemountFailed = 5,
    /// Device name empty, absolute or escaping the root
    InvalidName = 6,
    /// Host entry missing or unreadable
    InspectFailed = 7,
    /// Host entry is not a block or char device
    NotADevice = 8,
    /// Host symlink has a relative target
    NonAbsoluteSymlink = 9,
    /// Creating the symlink, directory or device node failed
    CreateFailed = 10,
    /// Unknown error
    Unknown = 99,
}

impl From<&DevMirrorError> for DevmirrorStatus {
    fn from(err: &DevMirrorError) -> Self {
        match err {
            DevMirrorError::Mount { .. } => Self::MountFailed,
            DevMirrorError::Remount { .. } => Self::RemountFailed,
            DevMirrorError::TargetInspect { .. } => Self::InspectFailed,
            DevMirrorError::Copy { source, .. } => match source {
                CopyError::InvalidName { .. } => Self::InvalidName,
                CopyError::Inspect { .. }
                | CopyError::InspectNoFollow { .. }
                | CopyError::ReadLink { .. } => Self::InspectFailed,
                CopyError::NotADevice { .. } => Self::NotADevice,
                CopyError::NonAbsoluteSymlink { .. } => Self::NonAbsoluteSymlink,
                CopyError::SymlinkCreate { .. }
                | CopyError::Mkdir { .. }
                | CopyError::Mknod { .. } => Self::CreateFailed,
            },
            DevMirrorError::Config(_) => Self::Unknown,
        }
    }
}

// Thread-local error message
thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn set_last_error(msg: String) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some(msg);
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Get the last error message
///
/// Returns NULL if the last call succeeded. The returned string is valid until
/// the next devmirror call on this thread.
#[unsafe(no_mangle)]
pub extern "C" fn devmirror_last_error() -> *const c_char {
    thread_local! {
        static ERROR_BUF: RefCell<Option<CString>> = const { RefCell::new(None) };
    }

    LAST_ERROR.with(|e| {
        let err = e.borrow();
        match &*err {
            Some(msg) => ERROR_BUF.with(|buf| {
                let cstr = CString::new(msg.replace('\0', "\\0")).unwrap_or_default();
                let ptr = cstr.as_ptr();
                *buf.borrow_mut() = Some(cstr);
                ptr
            }),
            None => ptr::null(),
        }
    })
}

/// Populate the default device root (`/srv/dev`) from `/dev`
///
/// `names` points to `count` NUL-terminated device names.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn devmirror_mount_dev(
    names: *const *const c_char,
    count: size_t,
) -> DevmirrorStatus {
    // SAFETY: forwarded caller guarantees
    unsafe { mount_with(DevConfig::default(), names, count) }
}

/// Populate `target_root` from `host_root`
///
/// Either root may be NULL to use its default.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn devmirror_mount_dev_at(
    host_root: *const c_char,
    target_root: *const c_char,
    names: *const *const c_char,
    count: size_t,
) -> DevmirrorStatus {
    let mut config = DevConfig::default();

    for (raw, slot, what) in [
        (host_root, &mut config.host_root, "host_root"),
        (target_root, &mut config.target_root, "target_root"),
    ] {
        if raw.is_null() {
            continue;
        }
        // SAFETY: Caller guarantees non-null roots are valid C strings
        match unsafe { CStr::from_ptr(raw) }.to_str() {
            Ok(s) => *slot = PathBuf::from(s),
            Err(_) => {
                set_last_error(format!("invalid UTF-8 in {what}"));
                return DevmirrorStatus::InvalidUtf8;
            }
        }
    }

    // SAFETY: forwarded caller guarantees
    unsafe { mount_with(config, names, count) }
}

unsafe fn mount_with(
    mut config: DevConfig,
    names: *const *const c_char,
    count: size_t,
) -> DevmirrorStatus {
    clear_last_error();

    if names.is_null() && count > 0 {
        set_last_error("names is null".into());
        return DevmirrorStatus::NullPointer;
    }

    for i in 0..count {
        // SAFETY: Caller guarantees names points to count pointers
        let name = unsafe { *names.add(i) };
        if name.is_null() {
            set_last_error(format!("names[{i}] is null"));
            return DevmirrorStatus::NullPointer;
        }
        // SAFETY: Caller guarantees each name is a valid C string
        match unsafe { CStr::from_ptr(name) }.to_str() {
            Ok(s) => config.devices.push(s.to_owned()),
            Err(_) => {
                set_last_error(format!("invalid UTF-8 in names[{i}]"));
                return DevmirrorStatus::InvalidUtf8;
            }
        }
    }

    match devmirror_core::mount_dev(&SystemHost, &config) {
        Ok(MountOutcome::Sealed(_)) => DevmirrorStatus::Ok,
        Ok(MountOutcome::Skipped) => DevmirrorStatus::Skipped,
        Err(e) => {
            let status = DevmirrorStatus::from(&e);
            set_last_error(e.to_string());
            status
        }
    }
}

/// Get library version
#[unsafe(no_mangle)]
pub extern "C" fn devmirror_version() -> *const c_char {
    static VERSION: Lazy<CString> =
        Lazy::new(|| CString::new(env!("CARGO_PKG_VERSION")).unwrap_or_default());
    VERSION.as_ptr()
}
