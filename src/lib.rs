//! rb-ordmap: single-threaded ordered maps on red-black trees, in two
//! interchangeable flavors.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: an associative container over totally ordered keys with
//!   O(log n) search, insertion and removal, and sorted iteration.
//! - Two independent balancing strategies behind one surface
//!   ([`OrderedMap`]):
//!   - [`RecursiveRbMap`]: left-leaning red-black tree. Boxed nodes,
//!     recursive descent, shape restored by `balance` on the unwind path.
//!   - [`IterativeRbMap`]: classic red-black tree. Nodes in a `slotmap`
//!     arena with parent handles, loop-based insert/delete fixups.
//! - Shared pieces: the [`traversal`] iterators (level, pre, in and post
//!   order) and the structural validator run against a read-only
//!   [`Links`](traversal::Links) view that both variants provide.
//!
//! Constraints
//! - Single-owner, no internal locking. Maps are `Send` when `K` and `V`
//!   are, so they can move across threads or sit behind a `Mutex`. Debug
//!   builds are `!Sync` through the reentrancy guard's `Cell`.
//! - Keys are compared only through `K: Ord`; an inconsistent order is a
//!   caller bug with unspecified (but memory-safe) results.
//! - No node reference escapes a map. Traversals borrow the map, and the
//!   node handles seen through `Links` are opaque.
//!
//! Failure model
//! - `get` on an absent key fails with [`Error::KeyNotFound`].
//! - `min`/`max` on an empty map fail with [`Error::EmptyTree`].
//! - `remove`/`remove_min` of something absent return `None` and leave
//!   the length unchanged.
//!
//! Reentrancy
//! - Each map embeds a debug-only guard entered at every public method.
//!   `K: Ord` code that calls back into the same map while it is being
//!   restructured panics in debug builds; release builds pay nothing.
//!
//! Diagnostics
//! - `is_valid_red_black_tree` checks the coloring laws only.
//! - `check_structure` adds key order, length, left-leaning shape
//!   (recursive) and parent-link/arena consistency (iterative).
//! - With the `check_invariants` feature, every mutation runs
//!   `check_structure` under `debug_assert!`.
//!
//! Logging
//! - Rebalancing steps emit `tracing` events at TRACE level; `clear` logs
//!   at DEBUG. The crate never installs a subscriber.

mod error;
pub mod iterative_rb_map;
mod ordered_map;
pub mod recursive_rb_map;
mod reentrancy;
pub mod traversal;
mod validate;

#[cfg(test)]
mod rb_map_proptest;

// Public surface
pub use error::{Error, InvariantViolation, Result};
pub use iterative_rb_map::IterativeRbMap;
pub use ordered_map::OrderedMap;
pub use recursive_rb_map::RecursiveRbMap;
pub use traversal::Color;
