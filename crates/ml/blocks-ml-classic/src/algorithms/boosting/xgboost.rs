//! Distributed, histogram-based gradient-boosted regression tree builder.
//!
//! This module grows a single regression tree of bounded depth from a
//! horizontally partitioned feature matrix and per-row gradient/hessian
//! pairs, the way XGBoost's exact/approx tree builder does. It does not
//! run the boosting loop itself (learning-rate shrinkage, multiple
//! rounds, ensemble persistence): that belongs to a caller that computes
//! gradients/hessians per round and repeatedly invokes [`build_tree`].

mod builder;
mod gpair;
mod node_index;
mod reducer;
mod sampler;
mod split_proposals;
mod task;
mod tree;

pub use builder::TreeBuilder;
pub use gpair::GPair;
pub use node_index::{left_child, level_begin, nodes_in_level, parent, right_child};
pub use reducer::{MultiShardHarness, ShardReducer, ShardSlab, SingleShardReducer};
pub use sampler::SplitSampleSelector;
pub use split_proposals::{SparseSplitProposals, NOT_FOUND};
pub use task::{build_tree, BuildTreeConfig, FeatureMatrix, TreeOutput};
pub use tree::Tree;
