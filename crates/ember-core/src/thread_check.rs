//! Thread affinity verification for confined resources.
//!
//! A native rendering context must only ever be touched from the worker
//! thread that created it. [`ThreadAffinity`] records that thread when the
//! resource comes to life and lets every later access assert it is still
//! running there.
//!
//! Two levels of checking are provided:
//!
//! - [`ThreadAffinity::assert_same_thread`] is always active.
//! - [`ThreadAffinity::checked_assert_same_thread`] only runs while thread
//!   checks are enabled, which is the default in debug builds. Use
//!   [`set_thread_checks_enabled`] to turn them on in release builds.
//!
//! ```
//! use ember_core::thread_check::ThreadAffinity;
//!
//! struct ContextSlot {
//!     affinity: ThreadAffinity,
//!     handle: u64,
//! }
//!
//! impl ContextSlot {
//!     fn handle(&self) -> u64 {
//!         self.affinity.checked_assert_same_thread();
//!         self.handle
//!     }
//! }
//!
//! let slot = ContextSlot { affinity: ThreadAffinity::current(), handle: 7 };
//! assert_eq!(slot.handle(), 7);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

/// Flag to enable/disable runtime thread checks globally.
static THREAD_CHECKS_ENABLED: AtomicBool = AtomicBool::new(cfg!(debug_assertions));

/// Enable or disable runtime thread checks.
///
/// By default, thread checks are enabled in debug builds and disabled in
/// release builds.
pub fn set_thread_checks_enabled(enabled: bool) {
    THREAD_CHECKS_ENABLED.store(enabled, Ordering::SeqCst);
}

/// Check if runtime thread checks are currently enabled.
#[inline]
pub fn are_thread_checks_enabled() -> bool {
    THREAD_CHECKS_ENABLED.load(Ordering::Relaxed)
}

/// Records the thread a confined resource belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    thread_id: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Bind to the current thread.
    #[inline]
    pub fn current() -> Self {
        Self {
            thread_id: thread::current().id(),
        }
    }

    /// Bind to an explicit thread, e.g. a worker that has not run yet.
    #[inline]
    pub fn for_thread(thread_id: ThreadId) -> Self {
        Self { thread_id }
    }

    /// Get the thread ID this affinity is bound to.
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Check if the current thread matches this affinity.
    #[inline]
    pub fn is_same_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Assert that we are on the bound thread.
    ///
    /// # Panics
    ///
    /// Panics with a descriptive message if called from a different thread.
    #[inline]
    pub fn assert_same_thread(&self) {
        self.assert_same_thread_with_msg("confined resource accessed from wrong thread")
    }

    /// Assert that we are on the bound thread, with a custom message.
    ///
    /// # Panics
    ///
    /// Panics if called from a different thread.
    pub fn assert_same_thread_with_msg(&self, msg: &str) {
        if !self.is_same_thread() {
            self.panic_wrong_thread(msg);
        }
    }

    /// Assert that we are on the bound thread while thread checks are enabled.
    ///
    /// This is a no-op when checks are disabled.
    #[inline]
    pub fn checked_assert_same_thread(&self) {
        if are_thread_checks_enabled() {
            self.assert_same_thread();
        }
    }

    #[cold]
    #[inline(never)]
    fn panic_wrong_thread(&self, msg: &str) -> ! {
        let current = thread::current();
        let current_name = current.name().unwrap_or("<unnamed>");
        let current_id = current.id();

        panic!(
            "THREAD AFFINITY VIOLATION: {msg}\n\
            Resource is confined to thread {:?}\n\
            Current thread: \"{current_name}\" (ID: {current_id:?})\n\
            Submit the operation to the owning executor instead of calling it directly.",
            self.thread_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_thread_affinity_same_thread() {
        let affinity = ThreadAffinity::current();
        assert!(affinity.is_same_thread());
        affinity.assert_same_thread();
    }

    #[test]
    fn test_thread_affinity_different_thread() {
        let affinity = ThreadAffinity::current();

        let result = Arc::new(AtomicBool::new(false));
        let result_clone = result.clone();

        thread::spawn(move || {
            result_clone.store(!affinity.is_same_thread(), Ordering::SeqCst);
        })
        .join()
        .unwrap();

        assert!(result.load(Ordering::SeqCst));
    }

    #[test]
    fn test_thread_affinity_panic_on_wrong_thread() {
        let affinity = ThreadAffinity::current();

        let result = thread::spawn(move || {
            affinity.assert_same_thread();
        })
        .join();

        assert!(result.is_err(), "Expected thread to panic with affinity violation");
    }

    #[test]
    fn test_for_thread_binds_elsewhere() {
        let other = thread::spawn(|| thread::current().id()).join().unwrap();
        let affinity = ThreadAffinity::for_thread(other);

        assert_eq!(affinity.thread_id(), other);
        assert!(!affinity.is_same_thread());
    }

    #[test]
    fn test_checked_assert_same_thread_on_owner() {
        let affinity = ThreadAffinity::default();
        affinity.checked_assert_same_thread();
    }

    #[test]
    fn test_disabled_checks_skip_affinity_assert() {
        let previous = are_thread_checks_enabled();
        let affinity = ThreadAffinity::current();

        set_thread_checks_enabled(false);
        assert!(!are_thread_checks_enabled());
        let unchecked = thread::spawn(move || affinity.checked_assert_same_thread()).join();

        set_thread_checks_enabled(true);
        let checked = thread::spawn(move || affinity.checked_assert_same_thread()).join();

        set_thread_checks_enabled(previous);
        assert!(unchecked.is_ok());
        assert!(checked.is_err());
    }
}
