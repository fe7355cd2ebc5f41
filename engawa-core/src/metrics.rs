//! Adjacency-sum metrics for leaf orderings.

use crate::error::Result;
use crate::provider::{SimilarityProvider, checked_similarity};
use crate::tree::LeafId;

/// Sums the provider's value over every consecutive pair of `leaves`.
///
/// Sequences of fewer than two leaves sum to `0.0`.
///
/// # Errors
/// Returns [`crate::ReorderError::MissingSimilarity`] when a consecutive pair
/// has no recorded value and [`crate::ReorderError::Provider`] for other
/// provider failures.
///
/// # Examples
/// ```
/// use engawa_core::{LeafId, ProviderError, SimilarityProvider, adjacency_sum};
///
/// struct Ruler(Vec<f64>);
///
/// impl SimilarityProvider for Ruler {
///     fn name(&self) -> &str { "ruler" }
///     fn len(&self) -> usize { self.0.len() }
///     fn contains(&self, id: LeafId) -> bool { (id.get() as usize) < self.0.len() }
///     fn similarity(&self, a: LeafId, b: LeafId) -> Result<f64, ProviderError> {
///         Ok((self.0[a.get() as usize] - self.0[b.get() as usize]).abs())
///     }
/// }
///
/// let ruler = Ruler(vec![0.0, 2.0, 5.0]);
/// let order = [LeafId::new(0), LeafId::new(1), LeafId::new(2)];
/// assert_eq!(adjacency_sum(&order, &ruler)?, 5.0);
/// # Ok::<(), engawa_core::ReorderError>(())
/// ```
pub fn adjacency_sum<P>(leaves: &[LeafId], provider: &P) -> Result<f64>
where
    P: SimilarityProvider + ?Sized,
{
    let mut total = 0.0_f64;
    for pair in leaves.windows(2) {
        total += checked_similarity(provider, pair[0], pair[1])?;
    }
    Ok(total)
}

/// Before/after adjacency sums reported for a reordering run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReorderMetrics {
    adjacency_before: f64,
    adjacency_after: f64,
}

impl ReorderMetrics {
    pub(crate) fn new(adjacency_before: f64, adjacency_after: f64) -> Self {
        Self {
            adjacency_before,
            adjacency_after,
        }
    }

    /// Returns the adjacency sum of the input tree's leaf order.
    #[must_use]
    pub fn adjacency_before(&self) -> f64 {
        self.adjacency_before
    }

    /// Returns the adjacency sum of the reordered tree's leaf order.
    #[must_use]
    pub fn adjacency_after(&self) -> f64 {
        self.adjacency_after
    }

    /// Returns `after − before`. Positive means the sum grew; whether that is
    /// an improvement depends on the configured [`crate::Objective`].
    #[must_use]
    pub fn improvement(&self) -> f64 {
        self.adjacency_after - self.adjacency_before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    use crate::provider::ProviderError;

    struct Gaps;

    impl SimilarityProvider for Gaps {
        fn name(&self) -> &str {
            "gaps"
        }

        fn len(&self) -> usize {
            4
        }

        fn contains(&self, id: LeafId) -> bool {
            id.get() < 4
        }

        fn similarity(&self, a: LeafId, b: LeafId) -> core::result::Result<f64, ProviderError> {
            if a.get() >= 4 || b.get() >= 4 {
                return Err(ProviderError::MissingPair { left: a, right: b });
            }
            Ok(a.get().abs_diff(b.get()) as f64)
        }
    }

    #[rstest]
    #[case::empty(&[], 0.0)]
    #[case::single(&[LeafId::new(2)], 0.0)]
    #[case::pair(&[LeafId::new(0), LeafId::new(3)], 3.0)]
    #[case::run(&[LeafId::new(0), LeafId::new(2), LeafId::new(3)], 3.0)]
    fn sums_consecutive_pairs(#[case] leaves: &[LeafId], #[case] expected: f64) {
        let total = adjacency_sum(leaves, &Gaps).expect("sum must succeed");
        assert_eq!(total, expected);
    }

    #[rstest]
    fn missing_pair_surfaces_as_missing_similarity() {
        let order = [LeafId::new(0), LeafId::new(9)];
        let err = adjacency_sum(&order, &Gaps).expect_err("unknown leaf must fail");
        assert!(matches!(
            err,
            crate::ReorderError::MissingSimilarity { .. }
        ));
    }

    #[rstest]
    fn improvement_is_the_signed_difference() {
        let metrics = ReorderMetrics::new(2.0, 6.0);
        assert_eq!(metrics.adjacency_before(), 2.0);
        assert_eq!(metrics.adjacency_after(), 6.0);
        assert_eq!(metrics.improvement(), 4.0);
    }
}
