//! Structural diagnostics shared by both map variants.
//!
//! None of these run on normal mutation paths. Tests call them directly, and
//! the `check_invariants` feature wires `check_structure` into every mutation
//! behind `debug_assert!`.

use crate::error::InvariantViolation;
use crate::traversal::{Color, InOrder, Links};

/// Number of nodes on the longest root-to-leaf path. O(n).
pub(crate) fn height<'a, L: Links<'a>>(links: L) -> usize {
    fn go<'a, L: Links<'a>>(links: L, node: Option<L::NodeRef>) -> usize {
        match node {
            None => 0,
            Some(n) => 1 + go(links, links.left(n)).max(go(links, links.right(n))),
        }
    }
    go(links, links.root())
}

/// Checks the coloring laws: black root, no red node with a red child, and
/// equal black height on every path. Returns the tree's black height.
pub(crate) fn check_colors<'a, L: Links<'a>>(links: L) -> Result<usize, InvariantViolation> {
    fn black_height<'a, L: Links<'a>>(
        links: L,
        node: Option<L::NodeRef>,
        parent_red: bool,
    ) -> Result<usize, InvariantViolation> {
        let Some(n) = node else { return Ok(0) };
        let red = links.color(n) == Color::Red;
        if red && parent_red {
            return Err(InvariantViolation::RedRedAdjacency);
        }
        let left = black_height(links, links.left(n), red)?;
        let right = black_height(links, links.right(n), red)?;
        if left != right {
            return Err(InvariantViolation::BlackHeightMismatch { left, right });
        }
        Ok(left + usize::from(!red))
    }

    if links.color_of(links.root()) == Color::Red {
        return Err(InvariantViolation::RedRoot);
    }
    black_height(links, links.root(), false)
}

pub(crate) fn is_valid_red_black_tree<'a, L: Links<'a>>(links: L) -> bool {
    check_colors(links).is_ok()
}

/// Checks that in-order keys strictly ascend and that exactly `len` nodes
/// are reachable from the root.
pub(crate) fn check_order<'a, L>(links: L, len: usize) -> Result<(), InvariantViolation>
where
    L: Links<'a>,
    L::Key: Ord,
{
    let mut counted = 0usize;
    let mut prev: Option<&L::Key> = None;
    for (k, _) in InOrder::new(links) {
        if prev.is_some_and(|p| p >= k) {
            return Err(InvariantViolation::OutOfOrder);
        }
        prev = Some(k);
        counted += 1;
    }
    if counted != len {
        return Err(InvariantViolation::CountMismatch {
            counted,
            recorded: len,
        });
    }
    Ok(())
}

/// Checks that no node has a red right child.
pub(crate) fn check_left_leaning<'a, L: Links<'a>>(links: L) -> Result<(), InvariantViolation> {
    let mut stack: Vec<L::NodeRef> = links.root().into_iter().collect();
    while let Some(n) = stack.pop() {
        if links.color_of(links.right(n)) == Color::Red {
            return Err(InvariantViolation::RightLeaningRed);
        }
        stack.extend(links.left(n));
        stack.extend(links.right(n));
    }
    Ok(())
}
