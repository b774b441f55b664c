use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Holds a query slot; releases it on drop.
pub(crate) struct InFlight {
    flag: Arc<AtomicBool>,
}

impl InFlight {
    /// Claim the slot, or `None` if a query already holds it.
    pub(crate) fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
