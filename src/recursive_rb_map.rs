//! RecursiveRbMap: left-leaning red-black tree with recursive rebalancing.
//!
//! Nodes are uniquely owned through `Option<Box<Node>>` links. Every
//! recursive step takes a subtree by value and hands back its (possibly
//! rotated) root for the caller to re-attach, so the variant needs no parent
//! pointers. Red links encode the 3- and 4-nodes of a 2-3-4 tree and, at
//! rest, always lean left.
//!
//! Mutations restore shape on the way back up through `balance`. Removal
//! additionally pushes a red link down ahead of the descent (`move_red_left`
//! and `move_red_right`) so the node finally unlinked is never a lone black
//! leaf.
//!
//! Recursion depth is bounded by the tree height, at most about
//! `2 * log2(n + 1)`.

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
use tracing::{debug, trace};

type Link<K, V> = Option<Box<Node<K, V>>>;

// A tree node, owned by its parent (or by the map for the root).
#[derive(Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    color: Color,
    left: Link<K, V>,
    right: Link<K, V>,
}

/// Opaque handle to a node of a [`RecursiveRbMap`], valid while the map is
/// borrowed. It exposes nothing beyond what [`Links`] reads through it.
pub struct NodeRef<'a, K, V>(&'a Node<K, V>);

impl<K, V> Clone for NodeRef<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for NodeRef<'_, K, V> {}

impl<K, V> Node<K, V> {
    fn new_red(key: K, value: V) -> Box<Self> {
        Box::new(Node {
            key,
            value,
            color: Color::Red,
            left: None,
            right: None,
        })
    }
}

#[inline]
fn is_red<K, V>(link: &Link<K, V>) -> bool {
    matches!(link, Some(n) if n.color == Color::Red)
}

// Red test on the left grandchild through `link`.
#[inline]
fn left_is_red<K, V>(link: &Link<K, V>) -> bool {
    link.as_ref().is_some_and(|n| is_red(&n.left))
}

//        h                x
//       / \              / \
//      a   x     =>     h   c
//         / \          / \
//        b   c        a   b
fn rotate_left<K, V>(mut h: Box<Node<K, V>>) -> Box<Node<K, V>> {
    let mut x = h.right.take().expect("rotate_left needs a right child");
    h.right = x.left.take();
    x.color = h.color;
    h.color = Color::Red;
    x.left = Some(h);
    trace!("rotate left");
    x
}

//          h            x
//         / \          / \
//        x   c   =>   a   h
//       / \              / \
//      a   b            b   c
fn rotate_right<K, V>(mut h: Box<Node<K, V>>) -> Box<Node<K, V>> {
    let mut x = h.left.take().expect("rotate_right needs a left child");
    h.left = x.right.take();
    x.color = h.color;
    h.color = Color::Red;
    x.right = Some(h);
    trace!("rotate right");
    x
}

fn flip_colors<K, V>(h: &mut Node<K, V>) {
    h.color = h.color.toggled();
    if let Some(l) = h.left.as_mut() {
        l.color = l.color.toggled();
    }
    if let Some(r) = h.right.as_mut() {
        r.color = r.color.toggled();
    }
}

/// Restores left-leaning shape at `h` on the unwind path.
fn balance<K, V>(mut h: Box<Node<K, V>>) -> Box<Node<K, V>> {
    if is_red(&h.right) && !is_red(&h.left) {
        h = rotate_left(h);
    }
    if is_red(&h.left) && left_is_red(&h.left) {
        h = rotate_right(h);
    }
    if is_red(&h.left) && is_red(&h.right) {
        flip_colors(&mut h);
    }
    h
}

// Makes h.left or one of its children red, borrowing from the right sibling.
fn move_red_left<K, V>(mut h: Box<Node<K, V>>) -> Box<Node<K, V>> {
    flip_colors(&mut h);
    if left_is_red(&h.right) {
        let right = h.right.take().expect("checked by left_is_red");
        h.right = Some(rotate_right(right));
        h = rotate_left(h);
        flip_colors(&mut h);
    }
    h
}

// Makes h.right or one of its children red, borrowing from the left sibling.
fn move_red_right<K, V>(mut h: Box<Node<K, V>>) -> Box<Node<K, V>> {
    flip_colors(&mut h);
    if left_is_red(&h.left) {
        h = rotate_right(h);
        flip_colors(&mut h);
    }
    h
}

fn insert_at<K: Ord, V>(link: Link<K, V>, key: K, value: V) -> (Box<Node<K, V>>, Option<V>) {
    let Some(mut h) = link else {
        return (Node::new_red(key, value), None);
    };
    let old = match key.cmp(&h.key) {
        Ordering::Less => {
            let (left, old) = insert_at(h.left.take(), key, value);
            h.left = Some(left);
            old
        }
        Ordering::Greater => {
            let (right, old) = insert_at(h.right.take(), key, value);
            h.right = Some(right);
            old
        }
        Ordering::Equal => Some(mem::replace(&mut h.value, value)),
    };
    (balance(h), old)
}

// Detaches the leftmost node of the subtree rooted at `h`.
fn remove_min_at<K, V>(mut h: Box<Node<K, V>>) -> (Link<K, V>, Box<Node<K, V>>) {
    if h.left.is_none() {
        // Left-leaning: a node without a left child has no right child either.
        let rest = h.right.take();
        return (rest, h);
    }
    if !is_red(&h.left) && !left_is_red(&h.left) {
        h = move_red_left(h);
    }
    let left = h.left.take().expect("left child survives move_red_left");
    let (left, min) = remove_min_at(left);
    h.left = left;
    (Some(balance(h)), min)
}

// Reaching a missing child means `key` is absent. Every transform applied on
// the way down keeps black heights intact, so `balance` on the unwind path
// restores the shape without anything having been unlinked.
fn remove_at<K, V, Q>(mut h: Box<Node<K, V>>, key: &Q) -> (Link<K, V>, Option<(K, V)>)
where
    K: Borrow<Q>,
    Q: ?Sized + Ord,
{
    let removed;
    if key.cmp(h.key.borrow()) == Ordering::Less {
        if h.left.is_none() {
            return (Some(h), None);
        }
        if !is_red(&h.left) && !left_is_red(&h.left) {
            h = move_red_left(h);
        }
        let left = h.left.take().expect("left child survives move_red_left");
        let (left, entry) = remove_at(left, key);
        h.left = left;
        removed = entry;
    } else {
        if is_red(&h.left) {
            h = rotate_right(h);
        }
        if key.cmp(h.key.borrow()) == Ordering::Equal && h.right.is_none() {
            let Node {
                key: k,
                value: v,
                left,
                ..
            } = *h;
            return (left, Some((k, v)));
        }
        if h.right.is_none() {
            return (Some(balance(h)), None);
        }
        if !is_red(&h.right) && !left_is_red(&h.right) {
            h = move_red_right(h);
        }
        let right = h.right.take().expect("right child survives move_red_right");
        if key.cmp(h.key.borrow()) == Ordering::Equal {
            let (right, mut min) = remove_min_at(right);
            h.right = right;
            mem::swap(&mut h.key, &mut min.key);
            mem::swap(&mut h.value, &mut min.value);
            removed = Some((min.key, min.value));
        } else {
            let (right, entry) = remove_at(right, key);
            h.right = right;
            removed = entry;
        }
    }
    (Some(balance(h)), removed)
}

/// Ordered map on a left-leaning red-black tree with recursive rebalancing.
#[derive(Clone)]
pub struct RecursiveRbMap<K, V> {
    root: Link<K, V>,
    len: usize,
    reentrancy: DebugReentrancy,
}

impl<K, V> RecursiveRbMap<K, V> {
    pub const fn new() -> Self {
        Self {
            root: None,
            len: 0,
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter();
        debug!(dropped = self.len, "clearing recursive map");
        self.root = None;
        self.len = 0;
    }

    pub fn height(&self) -> usize {
        let _g = self.reentrancy.enter();
        validate::height(self)
    }

    pub fn min(&self) -> Result<(&K, &V)> {
        let _g = self.reentrancy.enter();
        let root = self.links().root().ok_or(Error::EmptyTree)?;
        Ok(self.links().entry(traversal::leftmost(self, root)))
    }

    pub fn max(&self) -> Result<(&K, &V)> {
        let _g = self.reentrancy.enter();
        let root = self.links().root().ok_or(Error::EmptyTree)?;
        Ok(self.links().entry(traversal::rightmost(self, root)))
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

    fn links(&self) -> &Self {
        self
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

impl<K: Ord, V> RecursiveRbMap<K, V> {
    /// Inserts or overwrites; returns the previous value for `key`, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let _g = self.reentrancy.enter();
        let (mut root, old) = insert_at(self.root.take(), key, value);
        root.color = Color::Black;
        self.root = Some(root);
        if old.is_none() {
            self.len += 1;
        }
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
        let mut root = self.root.take()?;
        if !is_red(&root.left) && !is_red(&root.right) {
            root.color = Color::Red;
        }
        let (root, removed) = remove_at(root, key);
        self.root = root;
        if let Some(r) = self.root.as_mut() {
            r.color = Color::Black;
        }
        if removed.is_some() {
            self.len -= 1;
        }
        self.debug_check();
        removed
    }

    pub fn remove_min(&mut self) -> Option<(K, V)> {
        let _g = self.reentrancy.enter();
        let mut root = self.root.take()?;
        if !is_red(&root.left) && !is_red(&root.right) {
            root.color = Color::Red;
        }
        let (root, min) = remove_min_at(root);
        self.root = root;
        if let Some(r) = self.root.as_mut() {
            r.color = Color::Black;
        }
        self.len -= 1;
        self.debug_check();
        let Node { key, value, .. } = *min;
        Some((key, value))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        traversal::find(self.links(), key).is_some()
    }

    pub fn get<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        traversal::find(self.links(), key)
            .map(|n| self.links().entry(n).1)
            .ok_or(Error::KeyNotFound)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        let mut cur = self.root.as_deref_mut();
        while let Some(node) = cur {
            cur = match key.cmp(node.key.borrow()) {
                Ordering::Less => node.left.as_deref_mut(),
                Ordering::Greater => node.right.as_deref_mut(),
                Ordering::Equal => return Some(&mut node.value),
            };
        }
        None
    }

    /// Full structural check: coloring laws, left-leaning shape, key order
    /// and length.
    pub fn check_structure(&self) -> core::result::Result<(), InvariantViolation> {
        let _g = self.reentrancy.enter();
        self.structure()
    }

    fn structure(&self) -> core::result::Result<(), InvariantViolation> {
        validate::check_colors(self)?;
        validate::check_left_leaning(self)?;
        validate::check_order(self, self.len)
    }
}

impl<'a, K, V> Links<'a> for &'a RecursiveRbMap<K, V> {
    type Key = K;
    type Value = V;
    type NodeRef = NodeRef<'a, K, V>;

    fn root(self) -> Option<Self::NodeRef> {
        self.root.as_deref().map(NodeRef)
    }

    fn left(self, node: Self::NodeRef) -> Option<Self::NodeRef> {
        node.0.left.as_deref().map(NodeRef)
    }

    fn right(self, node: Self::NodeRef) -> Option<Self::NodeRef> {
        node.0.right.as_deref().map(NodeRef)
    }

    fn color(self, node: Self::NodeRef) -> Color {
        node.0.color
    }

    fn entry(self, node: Self::NodeRef) -> (&'a K, &'a V) {
        (&node.0.key, &node.0.value)
    }
}

impl<K: Ord, V> OrderedMap<K, V> for RecursiveRbMap<K, V> {
    type Links<'a>
        = &'a RecursiveRbMap<K, V>
    where
        Self: 'a;

    fn links(&self) -> Self::Links<'_> {
        self
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        RecursiveRbMap::insert(self, key, value)
    }

    fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        RecursiveRbMap::remove(self, key)
    }

    fn remove_min(&mut self) -> Option<(K, V)> {
        RecursiveRbMap::remove_min(self)
    }

    fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        RecursiveRbMap::contains_key(self, key)
    }

    fn get<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        RecursiveRbMap::get(self, key)
    }

    fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        RecursiveRbMap::get_mut(self, key)
    }

    fn min(&self) -> Result<(&K, &V)> {
        RecursiveRbMap::min(self)
    }

    fn max(&self) -> Result<(&K, &V)> {
        RecursiveRbMap::max(self)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn height(&self) -> usize {
        RecursiveRbMap::height(self)
    }

    fn clear(&mut self) {
        RecursiveRbMap::clear(self)
    }

    fn is_valid_red_black_tree(&self) -> bool {
        RecursiveRbMap::is_valid_red_black_tree(self)
    }

    fn check_structure(&self) -> core::result::Result<(), InvariantViolation> {
        RecursiveRbMap::check_structure(self)
    }
}

impl<K, V> Default for RecursiveRbMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for RecursiveRbMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.in_order()).finish()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for RecursiveRbMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::new();
        m.extend(iter);
        m
    }
}

impl<K: Ord, V> Extend<(K, V)> for RecursiveRbMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a RecursiveRbMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = LevelOrder<'a, &'a RecursiveRbMap<K, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, Q> Index<&Q> for RecursiveRbMap<K, V>
where
    K: Ord + Borrow<Q>,
    Q: ?Sized + Ord,
{
    type Output = V;

    /// Panics if `key` is absent; use `get` for a fallible lookup.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not found in RecursiveRbMap")
    }
}
