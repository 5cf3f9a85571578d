//! Debug-only reentrancy detection for the shared core.
//!
//! The only user code that runs while the core's index, order carrier, and
//! watcher can be transiently inconsistent is `K: Eq`/`K: Hash` during
//! probing. Entering the core again from such code is a bug; in debug
//! builds it panics immediately instead of corrupting state. Release
//! builds compile the check away.

use core::cell::Cell;
use core::marker::PhantomData;

#[derive(Debug, Default)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    entered: Cell<bool>,
    // !Send + !Sync, matching the single-threaded core.
    _nosend: PhantomData<*mut ()>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            entered: Cell::new(false),
            _nosend: PhantomData,
        }
    }

    /// Enter a guarded section; the returned guard re-opens it on drop.
    ///
    /// The guard carries a raw pointer to `self` rather than a borrow, so
    /// holding it does not keep `self` immutably borrowed while the caller
    /// performs `&mut self` work under the guard. The pointer is always
    /// valid: the guard is a stack local that never outlives the call in
    /// which `enter` ran, and `self` is live for that whole call.
    #[inline]
    pub(crate) fn enter(&self) -> Entered {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.entered.replace(true),
                "reentrant call into a weak collection from key Eq/Hash code"
            );
        }
        Entered { owner: self }
    }
}

pub(crate) struct Entered {
    owner: *const DebugReentrancy,
}

impl Drop for Entered {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        // SAFETY: see `enter` — `owner` points at a `DebugReentrancy` that
        // outlives this guard.
        unsafe {
            (*self.owner).entered.set(false);
        }
        #[cfg(not(debug_assertions))]
        let _ = self.owner;
    }
}

#[cfg(test)]
mod tests {
    use super::DebugReentrancy;

    #[test]
    fn sequential_entries_are_fine() {
        let g = DebugReentrancy::new();
        drop(g.enter());
        drop(g.enter());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nested_entry_panics_in_debug() {
        let g = DebugReentrancy::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _outer = g.enter();
            let _inner = g.enter();
        }));
        assert!(res.is_err());
    }
}
