//! OrderedMap: the surface shared by both red-black map variants.

use crate::error::{InvariantViolation, Result};
use crate::traversal::{InOrder, LevelOrder, Links, PostOrder, PreOrder};
use core::borrow::Borrow;

/// An ordered map over totally ordered keys with logarithmic search,
/// insertion and removal.
///
/// [`RecursiveRbMap`](crate::RecursiveRbMap) and
/// [`IterativeRbMap`](crate::IterativeRbMap) implement this with identical
/// observable behavior, so either can stand in for the other. Both also
/// expose every method inherently.
pub trait OrderedMap<K: Ord, V> {
    /// Read-only node view used by the traversals.
    type Links<'a>: Links<'a, Key = K, Value = V>
    where
        Self: 'a;

    fn links(&self) -> Self::Links<'_>;

    /// Inserts or overwrites; returns the previous value for `key`, if any.
    fn insert(&mut self, key: K, value: V) -> Option<V>;

    /// Indexer-style set: inserts or overwrites.
    fn set(&mut self, key: K, value: V) {
        let _ = self.insert(key, value);
    }

    /// Removes `key`, returning its entry. `None` if it was absent.
    fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord;

    /// Removes the smallest entry. `None` if the map is empty.
    fn remove_min(&mut self) -> Option<(K, V)>;

    fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord;

    /// Indexer-style get: fails with `Error::KeyNotFound` when absent.
    fn get<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord;

    fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord;

    /// Smallest entry; fails with `Error::EmptyTree` on an empty map.
    fn min(&self) -> Result<(&K, &V)>;

    /// Largest entry; fails with `Error::EmptyTree` on an empty map.
    fn max(&self) -> Result<(&K, &V)>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Longest root-to-leaf path, recomputed on every call.
    fn height(&self) -> usize;

    fn clear(&mut self);

    fn is_valid_red_black_tree(&self) -> bool;

    fn check_structure(&self) -> core::result::Result<(), InvariantViolation>;

    /// Level-order walk; the default iteration order.
    fn iter(&self) -> LevelOrder<'_, Self::Links<'_>> {
        LevelOrder::new(self.links())
    }

    fn pre_order(&self) -> PreOrder<'_, Self::Links<'_>> {
        PreOrder::new(self.links())
    }

    fn in_order(&self) -> InOrder<'_, Self::Links<'_>> {
        InOrder::new(self.links())
    }

    fn post_order(&self) -> PostOrder<'_, Self::Links<'_>> {
        PostOrder::new(self.links())
    }
}
