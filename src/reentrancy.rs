//! Debug-only reentrancy guard for tree maps.
//!
//! Both map variants call into user code (`K: Ord`) while descending, and the
//! recursive variant does so after it has already recolored nodes on the way
//! down. A nested call into the same map at that point would observe a tree
//! that breaks the red-black laws. In debug builds the guard turns that into a
//! panic; in release builds it is a zero-sized no-op.

#[cfg(debug_assertions)]
use core::cell::Cell;
#[cfg(not(debug_assertions))]
use core::marker::PhantomData;

/// Per-map busy flag. Public entry points start with
/// `let _g = self.reentrancy.enter();`.
///
/// The debug `Cell` makes a map `!Sync` but keeps it `Send`, so a map can be
/// moved to another thread or shared behind a `Mutex`.
#[derive(Debug)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
        }
    }

    /// Marks the map busy until the returned guard drops.
    #[inline]
    #[track_caller]
    pub(crate) fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.busy.replace(true),
                "reentrancy detected: map accessed from inside its own key comparison"
            );
            return ReentrancyGuard { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            return ReentrancyGuard { _z: PhantomData };
        }
    }
}

impl Default for DebugReentrancy {
    fn default() -> Self {
        Self::new()
    }
}

// A cloned map starts idle regardless of the source's state.
impl Clone for DebugReentrancy {
    fn clone(&self) -> Self {
        Self::new()
    }
}

pub(crate) struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.busy.set(false);
    }
}
