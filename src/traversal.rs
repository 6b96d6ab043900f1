//! Traversal: read-only navigation and lazy walks shared by both map variants.
//!
//! Each variant exposes its node graph through [`Links`], a `Copy` view that
//! can step from a node to its children. The four traversal iterators and the
//! lookup helpers are written once against that view.
//!
//! Every iterator owns an explicit queue or stack, so a traversal is finite
//! (it visits each node once), lazy, and restartable: calling the producer
//! again starts an independent walk over the tree as it is at that moment.
//! The iterators hold a shared borrow of the map, so the map cannot be
//! mutated while one is alive.

use core::borrow::Borrow;
use core::cmp::Ordering;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use std::collections::VecDeque;

/// Node color of a red-black tree. Empty positions count as black.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Black,
}

impl Color {
    #[inline]
    pub(crate) fn toggled(self) -> Self {
        match self {
            Color::Red => Color::Black,
            Color::Black => Color::Red,
        }
    }
}

/// Read-only view of a red-black tree's node graph.
///
/// `NodeRef` is whatever cheaply identifies a node for the duration of the
/// borrow `'a`: a plain reference for the boxed recursive map, an arena
/// handle for the parent-linked iterative map.
pub trait Links<'a>: Copy {
    type Key: 'a;
    type Value: 'a;
    type NodeRef: Copy;

    fn root(self) -> Option<Self::NodeRef>;
    fn left(self, node: Self::NodeRef) -> Option<Self::NodeRef>;
    fn right(self, node: Self::NodeRef) -> Option<Self::NodeRef>;
    fn color(self, node: Self::NodeRef) -> Color;
    fn entry(self, node: Self::NodeRef) -> (&'a Self::Key, &'a Self::Value);

    /// Color of a possibly empty position.
    #[inline]
    fn color_of(self, node: Option<Self::NodeRef>) -> Color {
        node.map_or(Color::Black, |n| self.color(n))
    }
}

/// Locates the node holding `key` by binary descent from the root.
pub(crate) fn find<'a, L, Q>(links: L, key: &Q) -> Option<L::NodeRef>
where
    L: Links<'a>,
    L::Key: Borrow<Q>,
    Q: ?Sized + Ord,
{
    let mut cur = links.root();
    while let Some(n) = cur {
        let (k, _) = links.entry(n);
        cur = match key.cmp(k.borrow()) {
            Ordering::Less => links.left(n),
            Ordering::Greater => links.right(n),
            Ordering::Equal => return Some(n),
        };
    }
    None
}

pub(crate) fn leftmost<'a, L: Links<'a>>(links: L, mut node: L::NodeRef) -> L::NodeRef {
    while let Some(l) = links.left(node) {
        node = l;
    }
    node
}

pub(crate) fn rightmost<'a, L: Links<'a>>(links: L, mut node: L::NodeRef) -> L::NodeRef {
    while let Some(r) = links.right(node) {
        node = r;
    }
    node
}

/// Breadth-first walk: root, then each level left to right. This is the
/// default iteration order of both maps.
pub struct LevelOrder<'a, L: Links<'a>> {
    links: L,
    queue: VecDeque<L::NodeRef>,
    _pd: PhantomData<&'a ()>,
}

impl<'a, L: Links<'a>> LevelOrder<'a, L> {
    pub fn new(links: L) -> Self {
        let queue = links.root().into_iter().collect();
        Self {
            links,
            queue,
            _pd: PhantomData,
        }
    }
}

impl<'a, L: Links<'a>> Iterator for LevelOrder<'a, L> {
    type Item = (&'a L::Key, &'a L::Value);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.queue.pop_front()?;
        self.queue.extend(self.links.left(n));
        self.queue.extend(self.links.right(n));
        Some(self.links.entry(n))
    }
}

impl<'a, L: Links<'a>> FusedIterator for LevelOrder<'a, L> {}

/// Depth-first walk: node, left subtree, right subtree.
pub struct PreOrder<'a, L: Links<'a>> {
    links: L,
    stack: Vec<L::NodeRef>,
    _pd: PhantomData<&'a ()>,
}

impl<'a, L: Links<'a>> PreOrder<'a, L> {
    pub fn new(links: L) -> Self {
        let stack = links.root().into_iter().collect();
        Self {
            links,
            stack,
            _pd: PhantomData,
        }
    }
}

impl<'a, L: Links<'a>> Iterator for PreOrder<'a, L> {
    type Item = (&'a L::Key, &'a L::Value);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.stack.pop()?;
        // Right goes in first so the left subtree pops first.
        self.stack.extend(self.links.right(n));
        self.stack.extend(self.links.left(n));
        Some(self.links.entry(n))
    }
}

impl<'a, L: Links<'a>> FusedIterator for PreOrder<'a, L> {}

/// Depth-first walk: left subtree, node, right subtree. Yields keys in
/// ascending order.
pub struct InOrder<'a, L: Links<'a>> {
    links: L,
    stack: Vec<L::NodeRef>,
    _pd: PhantomData<&'a ()>,
}

impl<'a, L: Links<'a>> InOrder<'a, L> {
    pub fn new(links: L) -> Self {
        let mut it = Self {
            links,
            stack: Vec::new(),
            _pd: PhantomData,
        };
        it.push_left_spine(links.root());
        it
    }

    fn push_left_spine(&mut self, mut node: Option<L::NodeRef>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = self.links.left(n);
        }
    }
}

impl<'a, L: Links<'a>> Iterator for InOrder<'a, L> {
    type Item = (&'a L::Key, &'a L::Value);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.stack.pop()?;
        self.push_left_spine(self.links.right(n));
        Some(self.links.entry(n))
    }
}

impl<'a, L: Links<'a>> FusedIterator for InOrder<'a, L> {}

/// Depth-first walk: left subtree, right subtree, node.
pub struct PostOrder<'a, L: Links<'a>> {
    links: L,
    // (node, children already scheduled)
    stack: Vec<(L::NodeRef, bool)>,
    _pd: PhantomData<&'a ()>,
}

impl<'a, L: Links<'a>> PostOrder<'a, L> {
    pub fn new(links: L) -> Self {
        let stack = links.root().map(|n| (n, false)).into_iter().collect();
        Self {
            links,
            stack,
            _pd: PhantomData,
        }
    }
}

impl<'a, L: Links<'a>> Iterator for PostOrder<'a, L> {
    type Item = (&'a L::Key, &'a L::Value);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (n, expanded) = self.stack.pop()?;
            if expanded {
                return Some(self.links.entry(n));
            }
            self.stack.push((n, true));
            if let Some(r) = self.links.right(n) {
                self.stack.push((r, false));
            }
            if let Some(l) = self.links.left(n) {
                self.stack.push((l, false));
            }
        }
    }
}

impl<'a, L: Links<'a>> FusedIterator for PostOrder<'a, L> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IterativeRbMap, RecursiveRbMap};

    fn keys<'a, I: Iterator<Item = (&'a i32, &'a i32)>>(it: I) -> Vec<i32> {
        it.map(|(k, _)| *k).collect()
    }

    // Ascending 1..=7 leaves the left-leaning map as a perfect black tree
    // rooted at 4, which pins down every traversal order.
    fn perfect_seven() -> RecursiveRbMap<i32, i32> {
        (1..=7).map(|k| (k, k * 10)).collect()
    }

    /// Invariant: level order visits the root first, then each level left to right.
    #[test]
    fn level_order_is_breadth_first() {
        let m = perfect_seven();
        assert_eq!(keys(LevelOrder::new(&m)), vec![4, 2, 6, 1, 3, 5, 7]);
    }

    /// Invariant: pre order visits node, then left subtree, then right subtree.
    #[test]
    fn pre_order_is_node_left_right() {
        let m = perfect_seven();
        assert_eq!(keys(PreOrder::new(&m)), vec![4, 2, 1, 3, 6, 5, 7]);
    }

    /// Invariant: in order yields ascending keys with their values.
    #[test]
    fn in_order_is_sorted() {
        let m = perfect_seven();
        let pairs: Vec<(i32, i32)> = InOrder::new(&m).map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(i32, i32)> = (1..=7).map(|k| (k, k * 10)).collect();
        assert_eq!(pairs, expected);
    }

    /// Invariant: post order visits left subtree, right subtree, then node.
    #[test]
    fn post_order_is_left_right_node() {
        let m = perfect_seven();
        assert_eq!(keys(PostOrder::new(&m)), vec![1, 3, 2, 5, 7, 6, 4]);
    }

    /// Invariant: all walks over an empty tree are empty and stay exhausted.
    #[test]
    fn empty_tree_walks_are_empty() {
        let m: IterativeRbMap<i32, i32> = IterativeRbMap::new();
        let mut level = LevelOrder::new(&m);
        assert!(level.next().is_none());
        assert!(level.next().is_none());
        assert_eq!(PreOrder::new(&m).count(), 0);
        assert_eq!(InOrder::new(&m).count(), 0);
        assert_eq!(PostOrder::new(&m).count(), 0);
    }

    /// Invariant: each producer call is an independent, restartable walk.
    #[test]
    fn walks_are_restartable() {
        let m: IterativeRbMap<i32, i32> = (0..20).map(|k| (k, k)).collect();
        let mut first = InOrder::new(&m);
        let _ = first.next();
        let _ = first.next();
        let fresh: Vec<i32> = keys(InOrder::new(&m));
        assert_eq!(fresh, (0..20).collect::<Vec<_>>());
        assert_eq!(keys(first), (2..20).collect::<Vec<_>>());
    }

    /// Invariant: every walk visits each node exactly once.
    #[test]
    fn walks_visit_every_node_once() {
        let m: IterativeRbMap<i32, i32> = (0..100).rev().map(|k| (k, k)).collect();
        for mut visited in [
            keys(LevelOrder::new(&m)),
            keys(PreOrder::new(&m)),
            keys(InOrder::new(&m)),
            keys(PostOrder::new(&m)),
        ] {
            visited.sort_unstable();
            assert_eq!(visited, (0..100).collect::<Vec<_>>());
        }
    }

    /// Invariant: lookup helpers find present keys, the extremes, and nothing else.
    #[test]
    fn find_and_extremes() {
        let m = perfect_seven();
        let links = &m;
        let n = find(links, &5).expect("5 present");
        assert_eq!(links.entry(n), (&5, &50));
        assert!(find(links, &8).is_none());
        let root = links.root().unwrap();
        assert_eq!(*links.entry(leftmost(links, root)).0, 1);
        assert_eq!(*links.entry(rightmost(links, root)).0, 7);
    }

    #[test]
    fn toggled_flips_color() {
        assert_eq!(Color::Red.toggled(), Color::Black);
        assert_eq!(Color::Black.toggled(), Color::Red);
    }
}
