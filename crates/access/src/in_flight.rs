//! One-request-at-a-time latch.

use std::sync::atomic::{AtomicBool, Ordering};

/// Held while a provider request is in flight; released on drop.
pub(crate) struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    /// Take the latch, or `None` if another request holds it.
    pub(crate) fn acquire(latch: &'a AtomicBool) -> Option<Self> {
        latch
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(latch))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let latch = AtomicBool::new(false);
        let first = InFlight::acquire(&latch);
        assert!(first.is_some());
        assert!(InFlight::acquire(&latch).is_none());
        drop(first);
        assert!(InFlight::acquire(&latch).is_some());
    }
}
