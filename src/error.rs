//! Error types shared by both map variants.

use thiserror::Error;

/// Failures reported by lookups on an ordered map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    #[error("key not found in map")]
    KeyNotFound,

    #[error("map is empty")]
    EmptyTree,
}

pub type Result<T> = std::result::Result<T, Error>;

/// A broken structural law found by `check_structure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("root node is red")]
    RedRoot,

    #[error("red node has a red child")]
    RedRedAdjacency,

    #[error("black height differs between subtrees ({left} vs {right})")]
    BlackHeightMismatch { left: usize, right: usize },

    #[error("keys are not in ascending in-order sequence")]
    OutOfOrder,

    #[error("reachable node count {counted} does not match recorded length {recorded}")]
    CountMismatch { counted: usize, recorded: usize },

    #[error("red link leans right")]
    RightLeaningRed,

    #[error("child does not point back to its parent")]
    BrokenParentLink,

    #[error("arena holds a node that is unreachable or reached twice")]
    DanglingNode,
}
