//! Index algebra for the implicit binary-heap tree layout.
//!
//! Pure functions only; no state. The root is node 0, and the children
//! of node `n` are `2n+1` and `2n+2`.

pub fn left_child(n: usize) -> usize {
    2 * n + 1
}

pub fn right_child(n: usize) -> usize {
    2 * n + 2
}

pub fn parent(n: usize) -> usize {
    (n - 1) / 2
}

/// Index of the first node at depth `d`.
pub fn level_begin(d: usize) -> usize {
    (1usize << d) - 1
}

/// Number of nodes at depth `d`.
pub fn nodes_in_level(d: usize) -> usize {
    1usize << d
}
