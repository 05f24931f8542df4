use ndarray::{Array1, Array2};

use super::node_index::{left_child, right_child};

/// In-memory mutable regression tree, capacity `max_nodes`, with the
/// node arrays indexed by the implicit binary-heap scheme (root = 0,
/// children of `n` are `2n+1`/`2n+2`).
///
/// A node is a leaf iff `feature[n] == -1`. `AddSplit` never flips a
/// node from leaf to internal on its own children — a child stays a
/// leaf (with its own gradient/hessian/leaf_value already populated)
/// until it is itself split at a later depth.
#[derive(Debug, Clone)]
pub struct Tree {
    feature: Array1<i32>,
    split_value: Array1<f64>,
    gain: Array1<f64>,
    leaf_value: Array2<f64>,
    gradient: Array2<f64>,
    hessian: Array2<f64>,
}

impl Tree {
    pub fn new(max_nodes: usize, num_outputs: usize) -> Self {
        Self {
            feature: Array1::from_elem(max_nodes, -1),
            split_value: Array1::zeros(max_nodes),
            gain: Array1::zeros(max_nodes),
            leaf_value: Array2::zeros((max_nodes, num_outputs)),
            gradient: Array2::zeros((max_nodes, num_outputs)),
            hessian: Array2::zeros((max_nodes, num_outputs)),
        }
    }

    pub fn max_nodes(&self) -> usize {
        self.feature.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.leaf_value.ncols()
    }

    pub fn is_leaf(&self, node: usize) -> bool {
        self.feature[node] == -1
    }

    pub fn feature(&self, node: usize) -> i32 {
        self.feature[node]
    }

    pub fn split_value(&self, node: usize) -> f64 {
        self.split_value[node]
    }

    pub fn gain(&self, node: usize) -> f64 {
        self.gain[node]
    }

    pub fn leaf_value(&self, node: usize, output: usize) -> f64 {
        self.leaf_value[[node, output]]
    }

    pub fn gradient(&self, node: usize, output: usize) -> f64 {
        self.gradient[[node, output]]
    }

    pub fn hessian(&self, node: usize, output: usize) -> f64 {
        self.hessian[[node, output]]
    }

    /// Sets this node's gradient/hessian/leaf-value (used for the root
    /// at initialisation, and for every child written by `add_split`).
    pub fn set_leaf_stats(&mut self, node: usize, gradient: &[f64], hessian: &[f64], alpha: f64) {
        for o in 0..self.num_outputs() {
            self.gradient[[node, o]] = gradient[o];
            self.hessian[[node, o]] = hessian[o];
            self.leaf_value[[node, o]] = calculate_leaf_value(gradient[o], hessian[o], alpha);
        }
    }

    /// Marks `node` as an internal split on `feature_id <= threshold`
    /// and populates both children's gradient/hessian/leaf-value from
    /// the per-output left/right sums. Children remain leaves until
    /// split themselves.
    #[allow(clippy::too_many_arguments)]
    pub fn add_split(
        &mut self,
        node: usize,
        feature_id: usize,
        threshold: f64,
        gain: f64,
        gradient_left: &[f64],
        gradient_right: &[f64],
        hessian_left: &[f64],
        hessian_right: &[f64],
        alpha: f64,
    ) {
        self.feature[node] = feature_id as i32;
        self.split_value[node] = threshold;
        self.gain[node] = gain;

        let left = left_child(node);
        let right = right_child(node);
        self.set_leaf_stats(left, gradient_left, hessian_left, alpha);
        self.set_leaf_stats(right, gradient_right, hessian_right, alpha);
    }
}

/// `-G / (H + max(epsilon, alpha))`, the standard L2-regularized leaf
/// weight from the second-order Taylor approximation of the loss.
pub fn calculate_leaf_value(g: f64, h: f64, alpha: f64) -> f64 {
    -g / (h + regularizer(alpha))
}

/// `max(epsilon, alpha)`: guards every `H + ...` denominator against
/// division by (near-)zero hessian when `alpha` is zero or negative.
pub fn regularizer(alpha: f64) -> f64 {
    const EPSILON: f64 = 1e-12;
    alpha.max(EPSILON)
}

pub const EPSILON: f64 = 1e-12;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn new_tree_is_all_leaves() {
        let tree = Tree::new(7, 2);
        for n in 0..7 {
            assert!(tree.is_leaf(n));
        }
    }

    #[test]
    fn add_split_populates_children_but_not_grandchildren() {
        let mut tree = Tree::new(7, 1);
        tree.set_leaf_stats(0, &[-2.0], &[2.0], 0.0);
        tree.add_split(0, 3, 0.5, 2.0, &[-2.0], &[0.0], &[2.0], &[0.0], 0.0);

        assert!(!tree.is_leaf(0));
        assert_eq!(tree.feature(0), 3);
        assert_eq!(tree.split_value(0), 0.5);
        assert!(tree.is_leaf(1));
        assert!(tree.is_leaf(2));
        assert_relative_eq!(tree.leaf_value(1, 0), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn leaf_value_matches_regularized_formula() {
        assert_relative_eq!(calculate_leaf_value(-4.0, 2.0, 0.0), 2.0, epsilon = 1e-9);
        assert_relative_eq!(regularizer(0.0), EPSILON);
        assert_relative_eq!(regularizer(1.0), 1.0);
    }
}
