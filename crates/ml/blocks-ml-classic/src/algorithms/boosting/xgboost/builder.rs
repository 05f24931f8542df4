use ndarray::ArrayView2;
use num_traits::Float;
use tracing::{debug, trace};

use super::gpair::GPair;
use super::node_index::{left_child, level_begin, nodes_in_level, parent, right_child};
use super::reducer::ShardReducer;
use super::split_proposals::{SparseSplitProposals, NOT_FOUND};
use super::tree::{regularizer, Tree, EPSILON};

/// Row no longer occupies a node — it landed on a leaf and stopped
/// contributing to histograms.
pub const INACTIVE: i64 = -1;

/// Per-shard state machine that grows one level of the tree at a time:
/// a row-to-node position vector and a dense `(node, bin, output)`
/// histogram buffer, built with the sibling-subtraction optimisation
/// and reduced to a global histogram via an injected [`ShardReducer`].
pub struct TreeBuilder<'p, T> {
    positions: Vec<i64>,
    /// Flattened `(max_nodes, histogram_size, num_outputs)` buffer of
    /// `GPair`; only the slab for the level currently being built is
    /// ever mutated at a given depth.
    histogram_buffer: Vec<GPair>,
    num_rows: usize,
    num_features: usize,
    num_outputs: usize,
    max_nodes: usize,
    histogram_size: usize,
    split_proposals: &'p SparseSplitProposals<T>,
}

impl<'p, T: Float> TreeBuilder<'p, T> {
    pub fn new(
        num_rows: usize,
        num_features: usize,
        num_outputs: usize,
        max_nodes: usize,
        split_proposals: &'p SparseSplitProposals<T>,
    ) -> Self {
        let histogram_size = split_proposals.histogram_size();
        Self {
            positions: vec![0; num_rows],
            histogram_buffer: vec![GPair::ZERO; max_nodes * histogram_size * num_outputs],
            num_rows,
            num_features,
            num_outputs,
            max_nodes,
            histogram_size,
            split_proposals,
        }
    }

    pub fn positions(&self) -> &[i64] {
        &self.positions
    }

    fn bin_index(&self, node: usize, bin: usize, output: usize) -> usize {
        (node * self.histogram_size + bin) * self.num_outputs + output
    }

    /// Computes this shard's local `(G, H)` sums per output, reduces
    /// them across shards, and writes the root's leaf stats.
    pub fn initialise_root(
        &mut self,
        g: ArrayView2<f64>,
        h: ArrayView2<f64>,
        tree: &mut Tree,
        alpha: f64,
        reducer: &dyn ShardReducer,
    ) {
        let mut sums = vec![0.0; self.num_outputs * 2];
        for row in 0..self.num_rows {
            for o in 0..self.num_outputs {
                sums[o] += g[[row, o]];
                sums[self.num_outputs + o] += h[[row, o]];
            }
        }
        trace!(count = sums.len(), "all-reduce: root gradient/hessian sums");
        reducer.reduce(&mut sums);
        let (g_sum, h_sum) = sums.split_at(self.num_outputs);
        tree.set_leaf_stats(0, g_sum, h_sum, alpha);
    }

    /// No-op at depth 0. At depth >= 1, moves each active row into its
    /// child node (or deactivates it if its current node stayed a
    /// leaf), per the split decided at `depth - 1`.
    pub fn update_positions(&mut self, depth: usize, x: ArrayView2<T>, tree: &Tree) {
        if depth == 0 {
            return;
        }
        for row in 0..self.num_rows {
            let p = self.positions[row];
            if p < 0 || tree.is_leaf(p as usize) {
                self.positions[row] = INACTIVE;
                continue;
            }
            let node = p as usize;
            let feature = tree.feature(node) as usize;
            let value = x[[row, feature]].to_f64().expect("feature value must convert to f64");
            self.positions[row] = if value <= tree.split_value(node) {
                left_child(node) as i64
            } else {
                right_child(node) as i64
            };
        }
    }

    /// The child of `parent` chosen to be built directly from row data
    /// this depth; its sibling is obtained by subtraction from the
    /// (already-scanned) parent histogram. Ties favour the left child.
    fn directly_built_child(tree: &Tree, parent: usize, num_outputs: usize) -> usize {
        let left = left_child(parent);
        let right = right_child(parent);
        let left_hessian: f64 = (0..num_outputs).map(|o| tree.hessian(left, o)).sum();
        let right_hessian: f64 = (0..num_outputs).map(|o| tree.hessian(right, o)).sum();
        if left_hessian <= right_hessian {
            left
        } else {
            right
        }
    }

    fn is_direct_build(&self, tree: &Tree, depth: usize, node: usize) -> bool {
        if depth == 0 {
            return true;
        }
        let p = parent(node);
        Self::directly_built_child(tree, p, self.num_outputs) == node
    }

    /// Accumulates every active row's `(g, h)` into its node's
    /// histogram bins (sibling-subtraction: only the directly-built
    /// child of each internal parent is touched), then all-reduces and
    /// scans the current level's slab.
    pub fn compute_histogram(
        &mut self,
        depth: usize,
        x: ArrayView2<T>,
        g: ArrayView2<f64>,
        h: ArrayView2<f64>,
        tree: &Tree,
        reducer: &dyn ShardReducer,
    ) {
        self.accumulate_histogram(depth, x, g, h, tree);
        self.reduce_level(depth, reducer);
        self.scan(depth, tree);
    }

    /// The row-accumulation half of [`compute_histogram`], split out so
    /// a multi-shard test harness can gather every shard's local slab
    /// before summing them (see [`super::reducer::MultiShardHarness`]).
    pub fn accumulate_histogram(
        &mut self,
        depth: usize,
        x: ArrayView2<T>,
        g: ArrayView2<f64>,
        h: ArrayView2<f64>,
        tree: &Tree,
    ) {
        for row in 0..self.num_rows {
            let p = self.positions[row];
            if p < 0 {
                continue;
            }
            let node = p as usize;
            if !self.is_direct_build(tree, depth, node) {
                continue;
            }
            for feature in 0..self.num_features {
                let bin = self.split_proposals.find_bin(x[[row, feature]], feature);
                if bin == NOT_FOUND {
                    continue;
                }
                for o in 0..self.num_outputs {
                    let idx = self.bin_index(node, bin, o);
                    self.histogram_buffer[idx] += GPair::new(g[[row, o]], h[[row, o]]);
                }
            }
        }
    }

    /// The mutable flat-`f64` view of the level-`depth` slab, for the
    /// all-reduce collaborator.
    pub fn level_slab_mut(&mut self, depth: usize) -> &mut [f64] {
        let begin = level_begin(depth) * self.histogram_size * self.num_outputs;
        let len = nodes_in_level(depth) * self.histogram_size * self.num_outputs;
        GPair::as_f64_slice_mut(&mut self.histogram_buffer[begin..begin + len])
    }

    pub fn reduce_level(&mut self, depth: usize, reducer: &dyn ShardReducer) {
        let slab = self.level_slab_mut(depth);
        trace!(count = slab.len(), depth, "all-reduce: level histogram slab");
        reducer.reduce(slab);
    }

    /// Left-to-right inclusive prefix sum per `(node, feature)` over
    /// the current level's slab, then sibling subtraction for every
    /// node that was not built directly.
    pub fn scan(&mut self, depth: usize, tree: &Tree) {
        let level_start = level_begin(depth);
        let level_end = level_start + nodes_in_level(depth);

        for node in level_start..level_end {
            if self.is_direct_build(tree, depth, node) {
                self.scan_node(node);
            }
        }
        if depth > 0 {
            for node in level_start..level_end {
                if !self.is_direct_build(tree, depth, node) {
                    self.subtract_node(parent(node), node);
                }
            }
        }
    }

    fn scan_node(&mut self, node: usize) {
        for feature in 0..self.num_features {
            let range = self.split_proposals.feature_range(feature);
            for o in 0..self.num_outputs {
                let mut running = GPair::ZERO;
                for bin in range.clone() {
                    let idx = self.bin_index(node, bin, o);
                    running += self.histogram_buffer[idx];
                    self.histogram_buffer[idx] = running;
                }
            }
        }
    }

    /// `derived[bin,o] = parent[bin,o] - sibling_scanned[bin,o]`, where
    /// `sibling` is `derived`'s already-scanned, directly-built sibling.
    fn subtract_node(&mut self, parent: usize, derived: usize) {
        let sibling = if left_child(parent) == derived {
            right_child(parent)
        } else {
            left_child(parent)
        };
        for feature in 0..self.num_features {
            let range = self.split_proposals.feature_range(feature);
            for o in 0..self.num_outputs {
                for bin in range.clone() {
                    let parent_val = self.histogram_buffer[self.bin_index(parent, bin, o)];
                    let sibling_val = self.histogram_buffer[self.bin_index(sibling, bin, o)];
                    let idx = self.bin_index(derived, bin, o);
                    self.histogram_buffer[idx] = parent_val - sibling_val;
                }
            }
        }
    }

    /// Finds and applies the best split for every node at `depth`,
    /// leaving nodes with non-positive gain or non-positive child
    /// hessian as leaves.
    pub fn perform_best_split(&self, depth: usize, tree: &mut Tree, alpha: f64) {
        let level_start = level_begin(depth);
        let level_end = level_start + nodes_in_level(depth);
        let mut splits = 0;
        let mut leaves = 0;

        for node in level_start..level_end {
            if self.try_split_node(node, tree, alpha) {
                splits += 1;
            } else {
                leaves += 1;
            }
        }
        debug!(depth, splits, leaves, "level grown");
    }

    fn try_split_node(&self, node: usize, tree: &mut Tree, alpha: f64) -> bool {
        let r = regularizer(alpha);
        let mut best_feature = None;
        let mut best_bin = 0;
        let mut best_gain = 0.0_f64;

        for feature in 0..self.num_features {
            for bin in self.split_proposals.feature_range(feature) {
                let mut gain = 0.0;
                for o in 0..self.num_outputs {
                    let g_total = tree.gradient(node, o);
                    let h_total = tree.hessian(node, o);
                    let left = self.histogram_buffer[self.bin_index(node, bin, o)];
                    let g_right = g_total - left.g;
                    let h_right = h_total - left.h;
                    gain += 0.5
                        * (left.g * left.g / (left.h + r) + g_right * g_right / (h_right + r)
                            - g_total * g_total / (h_total + r));
                }
                if gain > best_gain {
                    best_gain = gain;
                    best_feature = Some(feature);
                    best_bin = bin;
                }
            }
        }

        let Some(feature) = best_feature else {
            return false;
        };
        if best_gain <= EPSILON {
            return false;
        }

        let mut gradient_left = vec![0.0; self.num_outputs];
        let mut gradient_right = vec![0.0; self.num_outputs];
        let mut hessian_left = vec![0.0; self.num_outputs];
        let mut hessian_right = vec![0.0; self.num_outputs];
        for o in 0..self.num_outputs {
            let left = self.histogram_buffer[self.bin_index(node, best_bin, o)];
            gradient_left[o] = left.g;
            hessian_left[o] = left.h;
            gradient_right[o] = tree.gradient(node, o) - left.g;
            hessian_right[o] = tree.hessian(node, o) - left.h;
        }
        if hessian_left[0] <= 0.0 || hessian_right[0] <= 0.0 {
            return false;
        }

        let threshold = self.split_proposals.thresholds()[best_bin].to_f64().unwrap();
        tree.add_split(
            node,
            feature,
            threshold,
            best_gain,
            &gradient_left,
            &gradient_right,
            &hessian_left,
            &hessian_right,
            alpha,
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::boosting::xgboost::reducer::SingleShardReducer;
    use approx::assert_relative_eq;
    use ndarray::{arr2, Array2};

    fn single_feature_proposals(values: &[f64]) -> SparseSplitProposals<f64> {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        sorted.dedup();
        SparseSplitProposals::new(vec![sorted])
    }

    #[test]
    fn perfect_split_matches_hand_computed_gain() {
        let x = arr2(&[[0.0], [0.0], [1.0], [1.0]]);
        let g = arr2(&[[-1.0], [-1.0], [1.0], [1.0]]);
        let h: Array2<f64> = Array2::ones((4, 1));
        let proposals = single_feature_proposals(&[0.0, 1.0]);
        let reducer = SingleShardReducer;

        let mut tree = Tree::new(3, 1);
        let mut builder = TreeBuilder::new(4, 1, 1, 3, &proposals);
        builder.initialise_root(g.view(), h.view(), &mut tree, 0.0, &reducer);
        builder.compute_histogram(0, x.view(), g.view(), h.view(), &tree, &reducer);
        builder.perform_best_split(0, &mut tree, 0.0);

        assert!(!tree.is_leaf(0));
        assert_eq!(tree.feature(0), 0);
        assert_relative_eq!(tree.split_value(0), 0.0, epsilon = 1e-9);
        assert_relative_eq!(tree.gain(0), 2.0, epsilon = 1e-9);
        assert_relative_eq!(tree.leaf_value(1, 0), 1.0, epsilon = 1e-6);
        assert_relative_eq!(tree.leaf_value(2, 0), -1.0, epsilon = 1e-6);
    }

    #[test]
    fn two_outputs_split_independently_and_preserve_gradient_invariant() {
        // Same X as `perfect_split_matches_hand_computed_gain`, with a second
        // output carrying the negated gradient. Both outputs must drive the
        // same split (gain sums over outputs) but keep independent per-output
        // histograms/leaf values.
        let x = arr2(&[[0.0], [0.0], [1.0], [1.0]]);
        let g = arr2(&[[-1.0, 1.0], [-1.0, 1.0], [1.0, -1.0], [1.0, -1.0]]);
        let h: Array2<f64> = Array2::ones((4, 2));
        let proposals = single_feature_proposals(&[0.0, 1.0]);
        let reducer = SingleShardReducer;

        let mut tree = Tree::new(3, 2);
        let mut builder = TreeBuilder::new(4, 1, 2, 3, &proposals);
        builder.initialise_root(g.view(), h.view(), &mut tree, 0.0, &reducer);
        builder.compute_histogram(0, x.view(), g.view(), h.view(), &tree, &reducer);
        builder.perform_best_split(0, &mut tree, 0.0);

        assert!(!tree.is_leaf(0));
        assert_eq!(tree.feature(0), 0);
        assert_relative_eq!(tree.split_value(0), 0.0, epsilon = 1e-9);
        // Each output contributes gain 2.0 independently; total gain sums them.
        assert_relative_eq!(tree.gain(0), 4.0, epsilon = 1e-9);

        // Output 0: same as the single-output case.
        assert_relative_eq!(tree.leaf_value(1, 0), 1.0, epsilon = 1e-6);
        assert_relative_eq!(tree.leaf_value(2, 0), -1.0, epsilon = 1e-6);
        // Output 1: mirrored (negated) leaf values.
        assert_relative_eq!(tree.leaf_value(1, 1), -1.0, epsilon = 1e-6);
        assert_relative_eq!(tree.leaf_value(2, 1), 1.0, epsilon = 1e-6);

        // Invariant 3 (§8): per-output gradient/hessian split exactly between
        // children, independent of every other output.
        for o in 0..2 {
            assert_relative_eq!(
                tree.gradient(1, o) + tree.gradient(2, o),
                tree.gradient(0, o),
                epsilon = 1e-9
            );
            assert_relative_eq!(
                tree.hessian(1, o) + tree.hessian(2, o),
                tree.hessian(0, o),
                epsilon = 1e-9
            );
        }
        // The two outputs' per-node hessians are identical but their
        // gradients are independent (negated), confirming bins/leaf values
        // aren't accidentally shared across outputs.
        assert_relative_eq!(tree.gradient(1, 0), -tree.gradient(1, 1), epsilon = 1e-9);
        assert_relative_eq!(tree.gradient(2, 0), -tree.gradient(2, 1), epsilon = 1e-9);
    }

    #[test]
    fn constant_target_stays_a_single_leaf() {
        let x: Array2<f64> = Array2::from_shape_fn((8, 2), |(i, j)| (i + j) as f64);
        let g: Array2<f64> = Array2::zeros((8, 1));
        let h: Array2<f64> = Array2::ones((8, 1));
        let proposals = SparseSplitProposals::new(vec![vec![0.0, 1.0], vec![0.0, 1.0]]);
        let reducer = SingleShardReducer;

        let mut tree = Tree::new(15, 1);
        let mut builder = TreeBuilder::new(8, 2, 1, 15, &proposals);
        builder.initialise_root(g.view(), h.view(), &mut tree, 1.0, &reducer);
        builder.compute_histogram(0, x.view(), g.view(), h.view(), &tree, &reducer);
        builder.perform_best_split(0, &mut tree, 1.0);

        assert!(tree.is_leaf(0));
        assert_relative_eq!(tree.leaf_value(0, 0), 0.0, epsilon = 1e-9);
        assert_relative_eq!(tree.hessian(0, 0), 8.0, epsilon = 1e-9);
        assert_relative_eq!(tree.gain(0), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn two_level_tree_deactivates_rows_at_an_unsplit_sibling() {
        // x: feature 0 in {0,1,2,3}; the best depth-0 split (threshold 1)
        // perfectly separates the two (g, h) clusters, so neither child
        // gains anything from a further split at depth 1.
        let x = arr2(&[[0.0], [1.0], [2.0], [3.0]]);
        let g = arr2(&[[-2.0], [-2.0], [1.0], [1.0]]);
        let h: Array2<f64> = Array2::ones((4, 1));
        let proposals = single_feature_proposals(&[0.0, 1.0, 2.0, 3.0]);
        let reducer = SingleShardReducer;

        let mut tree = Tree::new(7, 1);
        let mut builder = TreeBuilder::new(4, 1, 1, 7, &proposals);
        builder.initialise_root(g.view(), h.view(), &mut tree, 0.0, &reducer);

        builder.update_positions(0, x.view(), &tree);
        builder.compute_histogram(0, x.view(), g.view(), h.view(), &tree, &reducer);
        builder.perform_best_split(0, &mut tree, 0.0);
        assert!(!tree.is_leaf(0));

        builder.update_positions(1, x.view(), &tree);
        builder.compute_histogram(1, x.view(), g.view(), h.view(), &tree, &reducer);
        builder.perform_best_split(1, &mut tree, 0.0);

        // Node 1 (left child, rows 0,1 both g=-2,h=1) has zero impurity: no further split.
        assert!(tree.is_leaf(1));
        // Node 2 (right child, rows 2,3 both g=1,h=1) likewise.
        assert!(tree.is_leaf(2));
    }
}
