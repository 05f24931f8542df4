use num_traits::Float;

/// Sentinel returned by [`SparseSplitProposals::find_bin`] when a value
/// exceeds every threshold proposed for a feature.
pub const NOT_FOUND: usize = usize::MAX;

/// Sparse, compressed-row representation of the candidate split
/// thresholds for every feature.
///
/// `split_proposals` concatenates the sorted, per-feature-unique
/// candidate thresholds; `row_pointers[f]..row_pointers[f + 1]` is the
/// half-open bin range owned by feature `f`. A row with value `x` in
/// feature `f` belongs to the smallest bin `b` in that range with
/// `split_proposals[b] >= x` (i.e. the split `x <= split_proposals[b]`
/// sends the row left).
#[derive(Debug, Clone)]
pub struct SparseSplitProposals<T> {
    split_proposals: Vec<T>,
    row_pointers: Vec<usize>,
}

impl<T: Float> SparseSplitProposals<T> {
    /// Builds a proposal set from already-deduplicated, already-sorted
    /// per-feature threshold lists.
    ///
    /// `thresholds_per_feature[f]` must be strictly increasing; this is
    /// the shape [`SplitSampleSelector`](super::SplitSampleSelector)
    /// produces.
    pub fn new(thresholds_per_feature: Vec<Vec<T>>) -> Self {
        let mut row_pointers = Vec::with_capacity(thresholds_per_feature.len() + 1);
        let mut split_proposals = Vec::new();
        row_pointers.push(0);
        for mut thresholds in thresholds_per_feature {
            split_proposals.append(&mut thresholds);
            row_pointers.push(split_proposals.len());
        }
        Self {
            split_proposals,
            row_pointers,
        }
    }

    pub fn num_features(&self) -> usize {
        self.row_pointers.len() - 1
    }

    /// Total number of bins across all features.
    pub fn histogram_size(&self) -> usize {
        *self.row_pointers.last().unwrap_or(&0)
    }

    /// Half-open bin range `[begin, end)` owned by feature `f`.
    pub fn feature_range(&self, f: usize) -> std::ops::Range<usize> {
        self.row_pointers[f]..self.row_pointers[f + 1]
    }

    pub fn thresholds(&self) -> &[T] {
        &self.split_proposals
    }

    /// The smallest bin `b` in `feature_range(f)` with
    /// `split_proposals[b] >= x`, or [`NOT_FOUND`] if `x` exceeds every
    /// threshold proposed for `f`.
    pub fn find_bin(&self, x: T, f: usize) -> usize {
        let range = self.feature_range(f);
        let slice = &self.split_proposals[range.clone()];
        match slice.binary_search_by(|t| t.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Greater)) {
            Ok(i) => range.start + i,
            Err(i) if i < slice.len() => range.start + i,
            Err(_) => NOT_FOUND,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposals() -> SparseSplitProposals<f64> {
        SparseSplitProposals::new(vec![vec![0.0, 1.0, 2.0], vec![5.0]])
    }

    #[test]
    fn feature_ranges_and_histogram_size() {
        let p = proposals();
        assert_eq!(p.num_features(), 2);
        assert_eq!(p.feature_range(0), 0..3);
        assert_eq!(p.feature_range(1), 3..4);
        assert_eq!(p.histogram_size(), 4);
    }

    #[test]
    fn find_bin_picks_smallest_threshold_at_least_x() {
        let p = proposals();
        assert_eq!(p.find_bin(-1.0, 0), 0);
        assert_eq!(p.find_bin(0.0, 0), 0);
        assert_eq!(p.find_bin(0.5, 0), 1);
        assert_eq!(p.find_bin(2.0, 0), 2);
        assert_eq!(p.find_bin(2.1, 0), NOT_FOUND);
    }

    #[test]
    fn find_bin_is_scoped_to_its_feature() {
        let p = proposals();
        assert_eq!(p.find_bin(5.0, 1), 3);
        assert_eq!(p.find_bin(5.1, 1), NOT_FOUND);
    }

    #[test]
    fn empty_proposal_set() {
        let p: SparseSplitProposals<f64> = SparseSplitProposals::new(vec![]);
        assert_eq!(p.num_features(), 0);
        assert_eq!(p.histogram_size(), 0);
    }
}
