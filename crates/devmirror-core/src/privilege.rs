//! Capability preflight

use caps::{CapSet, Capability};

/// Capabilities needed to mount the tmpfs and create device nodes
pub const REQUIRED: [Capability; 2] = [Capability::CAP_SYS_ADMIN, Capability::CAP_MKNOD];

/// Required capabilities missing from the calling thread's effective set
#[must_use]
pub fn missing_capabilities() -> Vec<Capability> {
    REQUIRED
        .into_iter()
        .filter(|cap| !caps::has_cap(None, CapSet::Effective, *cap).unwrap_or(false))
        .collect()
}

/// Log missing capabilities; the kernel still gets the final say
pub fn warn_missing() {
    let missing = missing_capabilities();
    if !missing.is_empty() {
        tracing::warn!(?missing, "missing capabilities, mount or mknod will likely fail");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_is_subset_of_required() {
        for cap in missing_capabilities() {
            assert!(REQUIRED.contains(&cap));
        }
    }
}
