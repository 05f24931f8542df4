//! The partitioned-array runtime's all-reduce primitive, modeled as a
//! small trait so this crate can be driven in-process (one logical
//! shard) or exercised against a deterministic multi-shard simulator
//! in tests, without depending on an actual distributed runtime.

use ndarray::ArrayView2;
use num_traits::Float;

use super::builder::TreeBuilder;
use super::split_proposals::SparseSplitProposals;
use super::tree::Tree;

/// Sums `buf` element-wise across all shards and broadcasts the result
/// back into `buf` on every shard. Implementations must be
/// deterministic for a fixed shard set to preserve bit-reproducibility
/// (§8 of the design spec).
pub trait ShardReducer {
    fn reduce(&self, buf: &mut [f64]);
}

/// Identity reduction for the common case of a single logical shard
/// (this crate driven directly, not through the partitioned-array
/// runtime described in the outer spec).
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleShardReducer;

impl ShardReducer for SingleShardReducer {
    fn reduce(&self, _buf: &mut [f64]) {}
}

/// Row range `[lo, hi)` owned by one simulated shard.
#[derive(Debug, Clone, Copy)]
pub struct ShardSlab {
    pub lo: usize,
    pub hi: usize,
}

/// Deterministic test harness that grows one tree from N simulated
/// shards in lock-step, summing each shard's local contribution by
/// hand at every point the real runtime would call `SumAllReduce`.
///
/// This is not part of the production API surface (the real
/// partitioned-array runtime and its transport are out of scope, §1 of
/// the design spec) — it exists so [`super::task::build_tree`]'s
/// shard-invariance property is actually exercised in tests.
pub struct MultiShardHarness {
    pub shards: Vec<ShardSlab>,
}

impl MultiShardHarness {
    pub fn new(shards: Vec<ShardSlab>) -> Self {
        Self { shards }
    }

    /// Grows a tree of `max_depth` over rows partitioned into
    /// `self.shards`, using the same split proposals and hyperparameters
    /// on every shard.
    pub fn build_tree<T: Float>(
        &self,
        x: ArrayView2<T>,
        g: ArrayView2<f64>,
        h: ArrayView2<f64>,
        max_depth: usize,
        max_nodes: usize,
        alpha: f64,
        proposals: &SparseSplitProposals<T>,
    ) -> Tree {
        let num_outputs = g.ncols();
        let mut tree = Tree::new(max_nodes, num_outputs);

        let mut builders: Vec<TreeBuilder<T>> = self
            .shards
            .iter()
            .map(|s| TreeBuilder::new(s.hi - s.lo, x.ncols(), num_outputs, max_nodes, proposals))
            .collect();

        let mut root_sums = vec![0.0; num_outputs * 2];
        for slab in &self.shards {
            let local = self.local_root_sums(g, h, *slab, num_outputs);
            for (acc, v) in root_sums.iter_mut().zip(local.iter()) {
                *acc += v;
            }
        }
        let (g_sum, h_sum) = root_sums.split_at(num_outputs);
        tree.set_leaf_stats(0, g_sum, h_sum, alpha);

        for depth in 0..max_depth {
            for (builder, slab) in builders.iter_mut().zip(&self.shards) {
                builder.update_positions(depth, x.slice(ndarray::s![slab.lo..slab.hi, ..]), &tree);
            }
            for (builder, slab) in builders.iter_mut().zip(&self.shards) {
                builder.accumulate_histogram(
                    depth,
                    x.slice(ndarray::s![slab.lo..slab.hi, ..]),
                    g.slice(ndarray::s![slab.lo..slab.hi, ..]),
                    h.slice(ndarray::s![slab.lo..slab.hi, ..]),
                    &tree,
                );
            }
            let summed = self.sum_level_slabs(&mut builders, depth);
            for builder in builders.iter_mut() {
                builder.level_slab_mut(depth).copy_from_slice(&summed);
            }
            for builder in builders.iter_mut() {
                builder.scan(depth, &tree);
            }
            // Every shard now holds an identical, fully-reduced and
            // scanned histogram for this level, so any one of them
            // decides the split deterministically for all.
            builders[0].perform_best_split(depth, &mut tree, alpha);
        }

        tree
    }

    fn local_root_sums(
        &self,
        g: ArrayView2<f64>,
        h: ArrayView2<f64>,
        slab: ShardSlab,
        num_outputs: usize,
    ) -> Vec<f64> {
        let mut sums = vec![0.0; num_outputs * 2];
        for row in slab.lo..slab.hi {
            for o in 0..num_outputs {
                sums[o] += g[[row, o]];
                sums[num_outputs + o] += h[[row, o]];
            }
        }
        sums
    }

    fn sum_level_slabs<T: Float>(&self, builders: &mut [TreeBuilder<T>], depth: usize) -> Vec<f64> {
        let mut summed: Option<Vec<f64>> = None;
        for builder in builders.iter_mut() {
            let slab = builder.level_slab_mut(depth);
            match &mut summed {
                None => summed = Some(slab.to_vec()),
                Some(acc) => {
                    for (a, v) in acc.iter_mut().zip(slab.iter()) {
                        *a += v;
                    }
                }
            }
        }
        summed.unwrap_or_default()
    }
}
