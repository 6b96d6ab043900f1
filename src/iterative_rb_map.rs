//! IterativeRbMap: classic red-black tree with parent links and loop-based fixups.
//!
//! Nodes live in a `SlotMap` arena and refer to each other through
//! generational [`NodeKey`] handles. A node's `parent` handle is a
//! non-owning back-reference used only to walk upward during fixup; the
//! arena owns every node, so rotations are handle reassignments and no
//! reference cycles exist.
//!
//! Layering
//! - `Arena`: the structural layer. Descent, splicing, rotations and the
//!   insert/delete fixup loops. Never recurses.
//! - `IterativeRbMap`: public surface. Wraps the arena with the debug
//!   reentrancy guard and the shared traversal/validation code.
//!
//! Insert and delete fixups are written once against a `Side`, with the
//! mirrored cases obtained through `Side::opposite`.

use crate::error::{Error, InvariantViolation, Result};
use crate::ordered_map::OrderedMap;
use crate::reentrancy::DebugReentrancy;
use crate::traversal::{self, Color, InOrder, LevelOrder, Links, PostOrder, PreOrder};
use crate::validate;
use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::mem;
use core::ops::Index;
use hashbrown::HashSet;
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, trace};

new_key_type! {
    /// Opaque, generational handle to a node of an [`IterativeRbMap`].
    pub struct NodeKey;
}

#[derive(Debug, Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    color: Color,
    left: Option<NodeKey>,
    right: Option<NodeKey>,
    parent: Option<NodeKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

#[derive(Debug, Clone)]
struct Arena<K, V> {
    root: Option<NodeKey>,
    slots: SlotMap<NodeKey, Node<K, V>>,
}

impl<K, V> Arena<K, V> {
    fn new() -> Self {
        Self {
            root: None,
            slots: SlotMap::with_key(),
        }
    }

    fn parent(&self, n: NodeKey) -> Option<NodeKey> {
        self.slots[n].parent
    }

    fn child(&self, n: NodeKey, side: Side) -> Option<NodeKey> {
        match side {
            Side::Left => self.slots[n].left,
            Side::Right => self.slots[n].right,
        }
    }

    fn set_child(&mut self, n: NodeKey, side: Side, child: Option<NodeKey>) {
        match side {
            Side::Left => self.slots[n].left = child,
            Side::Right => self.slots[n].right = child,
        }
    }

    // Which side of its parent `n` hangs on. `n` must not be the root.
    fn side_of(&self, n: NodeKey) -> Side {
        let p = self.parent(n).expect("side_of needs a parent");
        if self.slots[p].left == Some(n) {
            Side::Left
        } else {
            Side::Right
        }
    }

    fn is_red(&self, n: Option<NodeKey>) -> bool {
        n.is_some_and(|n| self.slots[n].color == Color::Red)
    }

    fn paint(&mut self, n: NodeKey, color: Color) {
        self.slots[n].color = color;
    }

    fn leftmost(&self, mut n: NodeKey) -> NodeKey {
        while let Some(l) = self.slots[n].left {
            n = l;
        }
        n
    }

    fn find<Q>(&self, key: &Q) -> Option<NodeKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut cur = self.root;
        while let Some(n) = cur {
            cur = match key.cmp(self.slots[n].key.borrow()) {
                Ordering::Less => self.slots[n].left,
                Ordering::Greater => self.slots[n].right,
                Ordering::Equal => return Some(n),
            };
        }
        None
    }

    // Points `old`'s parent (or the root) at `new` and adopts `new` there.
    fn replace(&mut self, old: NodeKey, new: Option<NodeKey>) {
        let parent = self.parent(old);
        match parent {
            None => self.root = new,
            Some(p) => {
                let side = self.side_of(old);
                self.set_child(p, side, new);
            }
        }
        if let Some(n) = new {
            self.slots[n].parent = parent;
        }
    }

    // Rotates `x` down toward `dir`; its child on the opposite side takes its place.
    //
    //   rotate(x, Left):    x              y
    //                      / \            / \
    //                     a   y    =>    x   c
    //                        / \        / \
    //                       b   c      a   b
    fn rotate(&mut self, x: NodeKey, dir: Side) {
        let up = dir.opposite();
        let y = self.child(x, up).expect("rotation needs a child to lift");
        let inner = self.child(y, dir);
        self.set_child(x, up, inner);
        if let Some(b) = inner {
            self.slots[b].parent = Some(x);
        }
        self.replace(x, Some(y));
        self.set_child(y, dir, Some(x));
        self.slots[x].parent = Some(y);
        trace!(?dir, "rotate");
    }

    fn insert(&mut self, key: K, value: V) -> Option<V>
    where
        K: Ord,
    {
        let mut parent = None;
        let mut side = Side::Left;
        let mut cur = self.root;
        while let Some(n) = cur {
            parent = Some(n);
            let node = &mut self.slots[n];
            match key.cmp(&node.key) {
                Ordering::Less => {
                    side = Side::Left;
                    cur = node.left;
                }
                Ordering::Greater => {
                    side = Side::Right;
                    cur = node.right;
                }
                Ordering::Equal => return Some(mem::replace(&mut node.value, value)),
            }
        }

        let z = self.slots.insert(Node {
            key,
            value,
            color: Color::Red,
            left: None,
            right: None,
            parent,
        });
        match parent {
            None => self.root = Some(z),
            Some(p) => self.set_child(p, side, Some(z)),
        }
        self.fixup_after_insert(z);
        None
    }

    fn fixup_after_insert(&mut self, mut z: NodeKey) {
        while let Some(mut p) = self.parent(z).filter(|&p| self.is_red(Some(p))) {
            let g = self.parent(p).expect("a red node is never the root");
            let side = self.side_of(p);
            let uncle = self.child(g, side.opposite());

            if self.is_red(uncle) {
                trace!("insert fixup: red uncle");
                let u = uncle.expect("red uncle exists");
                self.paint(p, Color::Black);
                self.paint(u, Color::Black);
                self.paint(g, Color::Red);
                z = g;
                continue;
            }

            if self.child(p, side.opposite()) == Some(z) {
                trace!("insert fixup: inner child");
                self.rotate(p, side);
                z = p;
                p = self.parent(z).expect("rotation lifted z above p");
            }

            trace!("insert fixup: outer child");
            self.paint(p, Color::Black);
            self.paint(g, Color::Red);
            self.rotate(g, side.opposite());
        }
        if let Some(r) = self.root {
            self.paint(r, Color::Black);
        }
    }

    fn remove_node(&mut self, mut z: NodeKey) -> (K, V) {
        if let (Some(_), Some(r)) = (self.slots[z].left, self.slots[z].right) {
            // Move the in-order successor's entry up; unlink the successor instead.
            let s = self.leftmost(r);
            let [zn, sn] = self
                .slots
                .get_disjoint_mut([z, s])
                .expect("node and successor are distinct live nodes");
            mem::swap(&mut zn.key, &mut sn.key);
            mem::swap(&mut zn.value, &mut sn.value);
            z = s;
        }

        let removed_black = self.slots[z].color == Color::Black;
        match self.slots[z].left.or(self.slots[z].right) {
            Some(child) => {
                self.replace(z, Some(child));
                if removed_black {
                    self.fixup_after_delete(child);
                }
            }
            None => {
                // A black leaf is fixed up in place before it is unlinked.
                if removed_black {
                    self.fixup_after_delete(z);
                }
                self.replace(z, None);
            }
        }

        let node = self.slots.remove(z).expect("spliced node is live");
        (node.key, node.value)
    }

    // `x` carries an extra black that has to be pushed up or absorbed.
    fn fixup_after_delete(&mut self, mut x: NodeKey) {
        while Some(x) != self.root && !self.is_red(Some(x)) {
            let p = self.parent(x).expect("non-root has a parent");
            let side = self.side_of(x);
            let far_side = side.opposite();
            let mut w = self
                .child(p, far_side)
                .expect("a double-black node has a sibling");

            if self.is_red(Some(w)) {
                trace!("delete fixup: red sibling");
                self.paint(w, Color::Black);
                self.paint(p, Color::Red);
                self.rotate(p, side);
                w = self.child(p, far_side).expect("rotation leaves a sibling");
            }

            let near = self.child(w, side);
            let far = self.child(w, far_side);
            if !self.is_red(near) && !self.is_red(far) {
                trace!("delete fixup: black nephews");
                self.paint(w, Color::Red);
                x = p;
                continue;
            }

            if !self.is_red(far) {
                trace!("delete fixup: red near nephew");
                let n = near.expect("near nephew is red");
                self.paint(n, Color::Black);
                self.paint(w, Color::Red);
                self.rotate(w, far_side);
                w = self.child(p, far_side).expect("rotation leaves a sibling");
            }

            trace!("delete fixup: red far nephew");
            let parent_color = self.slots[p].color;
            self.paint(w, parent_color);
            self.paint(p, Color::Black);
            if let Some(f) = self.child(w, far_side) {
                self.paint(f, Color::Black);
            }
            self.rotate(p, side);
            x = self.root.expect("tree is non-empty during fixup");
        }
        self.paint(x, Color::Black);
    }

    /// Parent links agree with child links and every arena slot is
    /// reachable from the root exactly once.
    fn check_links(&self) -> core::result::Result<(), InvariantViolation> {
        let mut seen: HashSet<NodeKey> = HashSet::with_capacity(self.slots.len());
        let mut stack: Vec<NodeKey> = Vec::new();
        if let Some(r) = self.root {
            if self.slots.get(r).map(|n| n.parent) != Some(None) {
                return Err(InvariantViolation::BrokenParentLink);
            }
            stack.push(r);
        }
        while let Some(n) = stack.pop() {
            if !seen.insert(n) {
                return Err(InvariantViolation::DanglingNode);
            }
            for c in [self.slots[n].left, self.slots[n].right].into_iter().flatten() {
                match self.slots.get(c) {
                    Some(child) if child.parent == Some(n) => stack.push(c),
                    _ => return Err(InvariantViolation::BrokenParentLink),
                }
            }
        }
        if seen.len() != self.slots.len() {
            return Err(InvariantViolation::DanglingNode);
        }
        Ok(())
    }
}

/// Ordered map on a parent-linked red-black tree with iterative fixups.
#[derive(Clone)]
pub struct IterativeRbMap<K, V> {
    arena: Arena<K, V>,
    reentrancy: DebugReentrancy,
}

impl<K, V> IterativeRbMap<K, V> {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.arena.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.slots.is_empty()
    }

    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter();
        debug!(dropped = self.arena.slots.len(), "clearing iterative map");
        self.arena.slots.clear();
        self.arena.root = None;
    }

    pub fn height(&self) -> usize {
        let _g = self.reentrancy.enter();
        validate::height(self)
    }

    pub fn min(&self) -> Result<(&K, &V)> {
        let _g = self.reentrancy.enter();
        let root = self.arena.root.ok_or(Error::EmptyTree)?;
        Ok(self.entry(traversal::leftmost(self, root)))
    }

    pub fn max(&self) -> Result<(&K, &V)> {
        let _g = self.reentrancy.enter();
        let root = self.arena.root.ok_or(Error::EmptyTree)?;
        Ok(self.entry(traversal::rightmost(self, root)))
    }

    pub fn is_valid_red_black_tree(&self) -> bool {
        let _g = self.reentrancy.enter();
        validate::is_valid_red_black_tree(self)
    }

    /// Default iteration: level order.
    pub fn iter(&self) -> LevelOrder<'_, &Self> {
        LevelOrder::new(self)
    }

    pub fn pre_order(&self) -> PreOrder<'_, &Self> {
        PreOrder::new(self)
    }

    pub fn in_order(&self) -> InOrder<'_, &Self> {
        InOrder::new(self)
    }

    pub fn post_order(&self) -> PostOrder<'_, &Self> {
        PostOrder::new(self)
    }

    #[inline]
    fn debug_check(&self)
    where
        K: Ord,
    {
        #[cfg(feature = "check_invariants")]
        debug_assert_eq!(self.structure(), Ok(()));
    }
}

impl<K: Ord, V> IterativeRbMap<K, V> {
    /// Inserts or overwrites; returns the previous value for `key`, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let _g = self.reentrancy.enter();
        let old = self.arena.insert(key, value);
        self.debug_check();
        old
    }

    pub fn set(&mut self, key: K, value: V) {
        let _ = self.insert(key, value);
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        let z = self.arena.find(key)?;
        let removed = self.arena.remove_node(z);
        self.debug_check();
        Some(removed)
    }

    pub fn remove_min(&mut self) -> Option<(K, V)> {
        let _g = self.reentrancy.enter();
        let min = self.arena.leftmost(self.arena.root?);
        let removed = self.arena.remove_node(min);
        self.debug_check();
        Some(removed)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        traversal::find(self, key).is_some()
    }

    pub fn get<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        traversal::find(self, key)
            .map(|n| &self.arena.slots[n].value)
            .ok_or(Error::KeyNotFound)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        let n = self.arena.find(key)?;
        self.arena.slots.get_mut(n).map(|node| &mut node.value)
    }

    /// Full structural check: coloring laws, key order, length, and
    /// parent/child link agreement across the arena.
    pub fn check_structure(&self) -> core::result::Result<(), InvariantViolation> {
        let _g = self.reentrancy.enter();
        self.structure()
    }

    fn structure(&self) -> core::result::Result<(), InvariantViolation> {
        self.arena.check_links()?;
        validate::check_colors(self)?;
        validate::check_order(self, self.len())
    }
}

impl<'a, K, V> Links<'a> for &'a IterativeRbMap<K, V> {
    type Key = K;
    type Value = V;
    type NodeRef = NodeKey;

    fn root(self) -> Option<NodeKey> {
        self.arena.root
    }

    fn left(self, node: NodeKey) -> Option<NodeKey> {
        self.arena.slots[node].left
    }

    fn right(self, node: NodeKey) -> Option<NodeKey> {
        self.arena.slots[node].right
    }

    fn color(self, node: NodeKey) -> Color {
        self.arena.slots[node].color
    }

    fn entry(self, node: NodeKey) -> (&'a K, &'a V) {
        let n = &self.arena.slots[node];
        (&n.key, &n.value)
    }
}

impl<K: Ord, V> OrderedMap<K, V> for IterativeRbMap<K, V> {
    type Links<'a>
        = &'a IterativeRbMap<K, V>
    where
        Self: 'a;

    fn links(&self) -> Self::Links<'_> {
        self
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        IterativeRbMap::insert(self, key, value)
    }

    fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        IterativeRbMap::remove(self, key)
    }

    fn remove_min(&mut self) -> Option<(K, V)> {
        IterativeRbMap::remove_min(self)
    }

    fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        IterativeRbMap::contains_key(self, key)
    }

    fn get<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        IterativeRbMap::get(self, key)
    }

    fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        IterativeRbMap::get_mut(self, key)
    }

    fn min(&self) -> Result<(&K, &V)> {
        IterativeRbMap::min(self)
    }

    fn max(&self) -> Result<(&K, &V)> {
        IterativeRbMap::max(self)
    }

    fn len(&self) -> usize {
        IterativeRbMap::len(self)
    }

    fn height(&self) -> usize {
        IterativeRbMap::height(self)
    }

    fn clear(&mut self) {
        IterativeRbMap::clear(self)
    }

    fn is_valid_red_black_tree(&self) -> bool {
        IterativeRbMap::is_valid_red_black_tree(self)
    }

    fn check_structure(&self) -> core::result::Result<(), InvariantViolation> {
        IterativeRbMap::check_structure(self)
    }
}

impl<K, V> Default for IterativeRbMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for IterativeRbMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.in_order()).finish()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for IterativeRbMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::new();
        m.extend(iter);
        m
    }
}

impl<K: Ord, V> Extend<(K, V)> for IterativeRbMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a IterativeRbMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = LevelOrder<'a, &'a IterativeRbMap<K, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, Q> Index<&Q> for IterativeRbMap<K, V>
where
    K: Ord + Borrow<Q>,
    Q: ?Sized + Ord,
{
    type Output = V;

    /// Panics if `key` is absent; use `get` for a fallible lookup.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not found in IterativeRbMap")
    }
}
