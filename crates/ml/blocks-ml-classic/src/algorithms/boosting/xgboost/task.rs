use ndarray::{Array1, Array2, ArrayView2};
use num_traits::Float;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::builder::TreeBuilder;
use super::reducer::ShardReducer;
use super::sampler::SplitSampleSelector;
use super::tree::Tree;

/// Validated task scalars (§6 of the design spec): hyperparameters that
/// are the same on every shard for a given `build_tree` call.
#[derive(Debug, Clone, Copy)]
pub struct BuildTreeConfig {
    pub max_depth: usize,
    pub max_nodes: usize,
    pub alpha: f64,
    pub split_samples: usize,
    pub seed: u64,
    pub dataset_rows: usize,
}

impl BuildTreeConfig {
    /// Validates that `max_nodes == 2^(max_depth + 1) - 1` and that the
    /// sampling parameters are usable, matching this crate's convention
    /// of rejecting bad hyperparameters at construction time rather
    /// than deep inside the level loop (see `DecisionTreeConfig` /
    /// `RandomForestConfig`).
    pub fn new(
        max_depth: usize,
        max_nodes: usize,
        alpha: f64,
        split_samples: usize,
        seed: u64,
        dataset_rows: usize,
    ) -> Result<Self> {
        let expected_max_nodes = (1usize << (max_depth + 1)) - 1;
        if max_nodes != expected_max_nodes {
            return Err(Error::InvalidParameter(format!(
                "max_nodes must equal 2^(max_depth+1)-1 = {expected_max_nodes}, got {max_nodes}"
            )));
        }
        if split_samples == 0 {
            return Err(Error::InvalidParameter("split_samples must be positive".to_string()));
        }
        if dataset_rows == 0 {
            return Err(Error::InvalidParameter("dataset_rows must be positive".to_string()));
        }
        if !alpha.is_finite() {
            return Err(Error::InvalidParameter("alpha must be finite".to_string()));
        }
        Ok(Self {
            max_depth,
            max_nodes,
            alpha,
            split_samples,
            seed,
            dataset_rows,
        })
    }
}

/// The five positional output stores this task writes (§6): per-node,
/// per-output leaf values and hessians, plus per-node feature, split
/// threshold and gain. `gradient` is training-only state and is never
/// emitted.
#[derive(Debug, Clone)]
pub struct TreeOutput {
    pub leaf_value: Array2<f64>,
    pub feature: Array1<i32>,
    pub split_value: Array1<f64>,
    pub gain: Array1<f64>,
    pub hessian: Array2<f64>,
}

impl TreeOutput {
    fn from_tree(tree: &Tree) -> Self {
        let max_nodes = tree.max_nodes();
        let num_outputs = tree.num_outputs();
        let mut leaf_value = Array2::zeros((max_nodes, num_outputs));
        let mut hessian = Array2::zeros((max_nodes, num_outputs));
        let mut feature = Array1::from_elem(max_nodes, -1);
        let mut split_value = Array1::zeros(max_nodes);
        let mut gain = Array1::zeros(max_nodes);

        for node in 0..max_nodes {
            feature[node] = tree.feature(node);
            split_value[node] = tree.split_value(node);
            gain[node] = tree.gain(node);
            for o in 0..num_outputs {
                leaf_value[[node, o]] = tree.leaf_value(node, o);
                hessian[[node, o]] = tree.hessian(node, o);
            }
        }

        Self {
            leaf_value,
            feature,
            split_value,
            gain,
            hessian,
        }
    }
}

/// The feature matrix's element type (§9 "Type dispatch"): the task is
/// monomorphized over `T`, but the returned tree is always in double
/// precision regardless of `T`.
pub enum FeatureMatrix<'a> {
    F32(ArrayView2<'a, f32>),
    F64(ArrayView2<'a, f64>),
}

impl<'a> FeatureMatrix<'a> {
    fn nrows(&self) -> usize {
        match self {
            FeatureMatrix::F32(x) => x.nrows(),
            FeatureMatrix::F64(x) => x.nrows(),
        }
    }

    fn ncols(&self) -> usize {
        match self {
            FeatureMatrix::F32(x) => x.ncols(),
            FeatureMatrix::F64(x) => x.ncols(),
        }
    }

    fn is_standard_layout(&self) -> bool {
        match self {
            FeatureMatrix::F32(x) => x.is_standard_layout(),
            FeatureMatrix::F64(x) => x.is_standard_layout(),
        }
    }
}

/// Validates inputs, builds the sparse split proposals, then runs
/// `Initialise -> (UpdatePositions, ComputeHistogram, PerformBestSplit)`
/// for `max_depth` levels and packages the result as the five output
/// stores (§4.5, §6).
///
/// `shard_lo` is this shard's row offset into the logical `[0,
/// dataset_rows)` range (needed by [`SplitSampleSelector`], which
/// cannot otherwise tell which sampled rows are local).
pub fn build_tree(
    x: FeatureMatrix,
    g: ArrayView2<f64>,
    h: ArrayView2<f64>,
    shard_lo: usize,
    config: &BuildTreeConfig,
    reducer: &dyn ShardReducer,
) -> Result<TreeOutput> {
    validate_inputs(&x, g, h)?;
    info!(
        num_rows = x.nrows(),
        num_features = x.ncols(),
        num_outputs = g.ncols(),
        max_depth = config.max_depth,
        "building tree"
    );

    match x {
        FeatureMatrix::F32(x) => build_tree_typed(x, g, h, shard_lo, config, reducer),
        FeatureMatrix::F64(x) => build_tree_typed(x, g, h, shard_lo, config, reducer),
    }
}

fn validate_inputs(x: &FeatureMatrix, g: ArrayView2<f64>, h: ArrayView2<f64>) -> Result<()> {
    if !x.is_standard_layout() {
        return Err(Error::InvalidState("feature matrix must be dense row-major".to_string()));
    }
    if x.nrows() != g.nrows() || x.nrows() != h.nrows() {
        return Err(Error::InvalidDimensions {
            expected: vec![x.nrows()],
            got: vec![g.nrows(), h.nrows()],
        });
    }
    if g.ncols() != h.ncols() {
        return Err(Error::InvalidDimensions {
            expected: vec![g.ncols()],
            got: vec![h.ncols()],
        });
    }
    Ok(())
}

fn build_tree_typed<T: Float>(
    x: ArrayView2<T>,
    g: ArrayView2<f64>,
    h: ArrayView2<f64>,
    shard_lo: usize,
    config: &BuildTreeConfig,
    reducer: &dyn ShardReducer,
) -> Result<TreeOutput> {
    let num_rows = x.nrows();
    let num_features = x.ncols();
    let num_outputs = g.ncols();

    let proposals = SplitSampleSelector::select(
        x,
        shard_lo,
        config.dataset_rows,
        config.split_samples,
        config.seed,
        reducer,
    );

    let mut tree = Tree::new(config.max_nodes, num_outputs);
    let mut builder = TreeBuilder::new(num_rows, num_features, num_outputs, config.max_nodes, &proposals);

    builder.initialise_root(g, h, &mut tree, config.alpha, reducer);

    for depth in 0..config.max_depth {
        builder.update_positions(depth, x, &tree);
        builder.compute_histogram(depth, x, g, h, &tree, reducer);
        builder.perform_best_split(depth, &mut tree, config.alpha);
    }

    debug!(max_nodes = config.max_nodes, "tree build complete");
    Ok(TreeOutput::from_tree(&tree))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::boosting::xgboost::reducer::SingleShardReducer;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    #[test]
    fn rejects_mismatched_max_nodes() {
        assert!(BuildTreeConfig::new(2, 3, 1.0, 4, 0, 8).is_err());
        assert!(BuildTreeConfig::new(2, 7, 1.0, 4, 0, 8).is_ok());
    }

    #[test]
    fn rejects_zero_split_samples_and_dataset_rows() {
        assert!(BuildTreeConfig::new(1, 3, 1.0, 0, 0, 8).is_err());
        assert!(BuildTreeConfig::new(1, 3, 1.0, 4, 0, 0).is_err());
    }

    #[test]
    fn max_depth_zero_yields_root_only_tree() {
        let x = arr2(&[[0.0_f64], [1.0], [2.0], [3.0]]);
        let g = arr2(&[[-1.0], [-1.0], [1.0], [1.0]]);
        let h = arr2(&[[1.0], [1.0], [1.0], [1.0]]);
        let config = BuildTreeConfig::new(0, 1, 1.0, 4, 0, 4).unwrap();
        let reducer = SingleShardReducer;

        let output = build_tree(FeatureMatrix::F64(x.view()), g.view(), h.view(), 0, &config, &reducer).unwrap();

        assert_eq!(output.feature[0], -1);
        let expected = -0.0_f64 / (4.0 + 1.0);
        assert_relative_eq!(output.leaf_value[[0, 0]], expected, epsilon = 1e-9);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let x = arr2(&[[0.0_f64], [1.0]]);
        let g = arr2(&[[0.0_f64]]);
        let h = arr2(&[[1.0_f64]]);
        let config = BuildTreeConfig::new(1, 3, 0.0, 2, 0, 2).unwrap();
        let reducer = SingleShardReducer;

        let result = build_tree(FeatureMatrix::F64(x.view()), g.view(), h.view(), 0, &config, &reducer);
        assert!(matches!(result, Err(Error::InvalidDimensions { .. })));
    }

    #[test]
    fn f32_feature_matrix_dispatches_correctly() {
        let x = arr2(&[[0.0_f32], [0.0], [1.0], [1.0]]);
        let g = arr2(&[[-1.0_f64], [-1.0], [1.0], [1.0]]);
        let h = arr2(&[[1.0_f64], [1.0], [1.0], [1.0]]);
        let config = BuildTreeConfig::new(1, 3, 0.0, 4, 0, 4).unwrap();
        let reducer = SingleShardReducer;

        let output = build_tree(FeatureMatrix::F32(x.view()), g.view(), h.view(), 0, &config, &reducer).unwrap();
        assert_eq!(output.feature[0], 0);
        assert_relative_eq!(output.gain[0], 2.0, epsilon = 1e-6);
    }
}
