use ndarray::ArrayView2;
use num_traits::Float;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::reducer::ShardReducer;
use super::split_proposals::SparseSplitProposals;

/// Draws a reproducible random sample of rows, exchanges the sampled
/// feature values across shards, deduplicates per feature, and emits a
/// [`SparseSplitProposals`] of candidate split thresholds.
pub struct SplitSampleSelector;

impl SplitSampleSelector {
    /// `x_slab` is this shard's contiguous row range `[shard_lo, shard_lo
    /// + x_slab.nrows())`; `dataset_rows` is the *global* row count,
    /// which a shard cannot infer from its own slab.
    ///
    /// Every shard must be called with the same `seed` and
    /// `dataset_rows` so that every shard draws an identical sequence
    /// of sampled row indices (§4.2 of the design spec).
    pub fn select<T: Float>(
        x_slab: ArrayView2<T>,
        shard_lo: usize,
        dataset_rows: usize,
        split_samples: usize,
        seed: u64,
        reducer: &dyn ShardReducer,
    ) -> SparseSplitProposals<T> {
        let num_features = x_slab.ncols();
        let sampled_rows = Self::sample_row_indices(dataset_rows, split_samples, seed);

        // draft[feature][sample] laid out row-major as feature-major so the
        // all-reduce buffer is contiguous per feature, matching the
        // reference layout of a (num_features x split_samples) matrix.
        let mut draft = vec![0.0_f64; num_features * split_samples];
        for (sample_idx, &row) in sampled_rows.iter().enumerate() {
            if row >= shard_lo && row - shard_lo < x_slab.nrows() {
                let local_row = row - shard_lo;
                for feature in 0..num_features {
                    draft[feature * split_samples + sample_idx] =
                        x_slab[[local_row, feature]].to_f64().expect("feature value must convert to f64");
                }
            }
        }

        // At most one shard contributes a nonzero value per cell (every
        // sampled row lives on exactly one shard), so a plain sum
        // reduces to concatenation: every shard ends up holding every
        // sampled value. Reducing in f64 (rather than reinterpreting a
        // raw T buffer as doubles) keeps this correct for T = f32 too.
        reducer.reduce(&mut draft);

        let mut thresholds_per_feature = Vec::with_capacity(num_features);
        for feature in 0..num_features {
            let mut values: Vec<T> = draft[feature * split_samples..(feature + 1) * split_samples]
                .iter()
                .map(|&v| T::from(v).expect("reduced value must convert back to T"))
                .collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap());
            values.dedup();
            thresholds_per_feature.push(values);
        }

        SparseSplitProposals::new(thresholds_per_feature)
    }

    /// The deterministic sequence of sampled row indices: identical on
    /// every shard given the same `(dataset_rows, split_samples, seed)`.
    fn sample_row_indices(dataset_rows: usize, split_samples: usize, seed: u64) -> Vec<usize> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..split_samples)
            .map(|_| rng.gen_range(0..dataset_rows.max(1)))
            .collect()
    }
}
