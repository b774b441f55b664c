//! Process-wide backend lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Bring the native backend library up.
///
/// Idempotent; returns `true` once the library is usable. Only the first
/// successful call queries and logs the linked libgit2 version.
pub fn init() -> bool {
    if INITIALIZED
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
    {
        let version = git2::Version::get();
        let (major, minor, rev) = version.libgit2_version();
        info!(libgit2 = %format!("{major}.{minor}.{rev}"), "backend initialized");
    }
    true
}

/// Mark the backend as shut down. Safe to call repeatedly.
///
/// libgit2 itself stays loaded until process exit; repositories opened
/// earlier remain valid.
pub fn shutdown() {
    if INITIALIZED.swap(false, Ordering::AcqRel) {
        debug!("backend shut down");
    }
}

/// Whether [`init`] has run since the last [`shutdown`].
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}
