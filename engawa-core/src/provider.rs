//! Similarity provider abstractions.
//!
//! The engine never computes pairwise values itself; it consumes them through
//! [`SimilarityProvider`]. Implementations must be symmetric, defined for
//! every unordered pair of leaves present in the tree, and consistent across
//! repeated calls with the same pair.

use std::sync::Arc;

use crate::error::ReorderError;
use crate::tree::LeafId;

/// Errors produced by [`SimilarityProvider`] operations.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// The provider has no value for the requested pair.
    #[error("no similarity recorded for pair ({left}, {right})")]
    MissingPair {
        /// First leaf of the offending pair.
        left: LeafId,
        /// Second leaf of the offending pair.
        right: LeafId,
    },
    /// The provider produced a NaN or infinite value.
    #[error("similarity for pair ({left}, {right}) is not finite")]
    NonFinite {
        /// First leaf of the offending pair.
        left: LeafId,
        /// Second leaf of the offending pair.
        right: LeafId,
    },
    /// A leaf id is outside the provider's domain.
    #[error("leaf {id} is not covered by this provider")]
    UnknownLeaf {
        /// The uncovered leaf.
        id: LeafId,
    },
    /// Provided output buffer length did not match the candidate count.
    #[error("output buffer has length {out} but {expected} candidates were given")]
    OutputLengthMismatch {
        /// Caller-provided buffer length.
        out: usize,
        /// Number of candidates supplied for the batch.
        expected: usize,
    },
}

impl ProviderError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> ProviderErrorCode {
        match self {
            Self::MissingPair { .. } => ProviderErrorCode::MissingPair,
            Self::NonFinite { .. } => ProviderErrorCode::NonFinite,
            Self::UnknownLeaf { .. } => ProviderErrorCode::UnknownLeaf,
            Self::OutputLengthMismatch { .. } => ProviderErrorCode::OutputLengthMismatch,
        }
    }
}

/// Machine-readable error codes for [`ProviderError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ProviderErrorCode {
    /// The provider has no value for the requested pair.
    MissingPair,
    /// The provider produced a non-finite value.
    NonFinite,
    /// A leaf id is outside the provider's domain.
    UnknownLeaf,
    /// Output buffer length mismatch in a batch call.
    OutputLengthMismatch,
}

impl ProviderErrorCode {
    /// Returns the symbolic identifier for logging surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingPair => "PROVIDER_MISSING_PAIR",
            Self::NonFinite => "PROVIDER_NON_FINITE",
            Self::UnknownLeaf => "PROVIDER_UNKNOWN_LEAF",
            Self::OutputLengthMismatch => "PROVIDER_OUTPUT_LENGTH_MISMATCH",
        }
    }
}

/// Direction of the optimization.
///
/// A single objective is configured per run and applied uniformly by the
/// table builder and the reconstructor; it is never decided per call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Objective {
    /// Provider values are similarities; larger adjacency sums are better.
    MaximizeSimilarity,
    /// Provider values are distances; smaller adjacency sums are better.
    MinimizeDistance,
}

impl Objective {
    /// Returns `true` when `candidate` is strictly preferable to `incumbent`.
    #[must_use]
    pub fn better(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::MaximizeSimilarity => candidate > incumbent,
            Self::MinimizeDistance => candidate < incumbent,
        }
    }

    /// Returns the identity score for folds: every finite value beats it.
    #[must_use]
    pub fn identity(self) -> f64 {
        match self {
            Self::MaximizeSimilarity => f64::NEG_INFINITY,
            Self::MinimizeDistance => f64::INFINITY,
        }
    }
}

/// Abstraction over a source of pairwise leaf similarities or distances.
///
/// # Examples
/// ```
/// use engawa_core::{LeafId, ProviderError, SimilarityProvider};
///
/// struct Ruler(Vec<f64>);
///
/// impl SimilarityProvider for Ruler {
///     fn name(&self) -> &str { "ruler" }
///     fn len(&self) -> usize { self.0.len() }
///     fn contains(&self, id: LeafId) -> bool { (id.get() as usize) < self.0.len() }
///     fn similarity(&self, a: LeafId, b: LeafId) -> Result<f64, ProviderError> {
///         let get = |id: LeafId| {
///             self.0
///                 .get(id.get() as usize)
///                 .copied()
///                 .ok_or(ProviderError::UnknownLeaf { id })
///         };
///         Ok((get(a)? - get(b)?).abs())
///     }
/// }
///
/// let ruler = Ruler(vec![1.0, 2.0, 4.0]);
/// assert_eq!(ruler.similarity(LeafId::new(0), LeafId::new(2))?, 3.0);
///
/// let mut out = vec![0.0; 2];
/// ruler.similarity_batch(LeafId::new(0), &[LeafId::new(1), LeafId::new(2)], &mut out)?;
/// assert_eq!(out, [1.0, 3.0]);
/// # Ok::<(), ProviderError>(())
/// ```
pub trait SimilarityProvider {
    /// Returns a human-readable name used in error payloads and spans.
    fn name(&self) -> &str;

    /// Returns the number of leaf records covered by this provider.
    fn len(&self) -> usize;

    /// Returns whether the provider covers no records.
    #[must_use]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns whether `id` falls within the provider's domain.
    fn contains(&self, id: LeafId) -> bool;

    /// Returns the pairwise value for `(a, b)`.
    ///
    /// Implementations must be symmetric and total over every unordered pair
    /// of leaves present in the tree being reordered.
    ///
    /// # Errors
    /// Returns [`ProviderError::MissingPair`] when the pair has no recorded
    /// value and [`ProviderError::UnknownLeaf`] when an id is outside the
    /// provider's domain.
    fn similarity(&self, a: LeafId, b: LeafId) -> Result<f64, ProviderError>;

    /// Computes the values from `query` to every entry in `candidates`,
    /// storing results in `out`.
    ///
    /// The default implementation calls [`SimilarityProvider::similarity`]
    /// per candidate; implementations may override it with batched kernels.
    ///
    /// # Errors
    /// Returns [`ProviderError::OutputLengthMismatch`] when
    /// `candidates.len() != out.len()`. If any candidate fails, `out` is left
    /// unmodified.
    fn similarity_batch(
        &self,
        query: LeafId,
        candidates: &[LeafId],
        out: &mut [f64],
    ) -> Result<(), ProviderError> {
        if candidates.len() != out.len() {
            return Err(ProviderError::OutputLengthMismatch {
                out: out.len(),
                expected: candidates.len(),
            });
        }
        // Compute into a temp buffer to keep `out` unchanged on error.
        let mut tmp = vec![0.0_f64; candidates.len()];
        for (slot, candidate) in tmp.iter_mut().zip(candidates) {
            *slot = self.similarity(query, *candidate)?;
        }
        out.copy_from_slice(&tmp);
        Ok(())
    }
}

/// Lifts a [`ProviderError`] into the core error type, promoting missing
/// pairs to the dedicated [`ReorderError::MissingSimilarity`] variant.
pub(crate) fn wrap_provider_error(provider: &str, error: ProviderError) -> ReorderError {
    match error {
        ProviderError::MissingPair { left, right } => ReorderError::MissingSimilarity {
            provider: Arc::from(provider),
            left,
            right,
        },
        other => ReorderError::Provider {
            provider: Arc::from(provider),
            error: other,
        },
    }
}

/// Queries the provider and rejects non-finite values.
pub(crate) fn checked_similarity<P>(
    provider: &P,
    a: LeafId,
    b: LeafId,
) -> Result<f64, ReorderError>
where
    P: SimilarityProvider + ?Sized,
{
    match provider.similarity(a, b) {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(_) => Err(ReorderError::Provider {
            provider: Arc::from(provider.name()),
            error: ProviderError::NonFinite { left: a, right: b },
        }),
        Err(error) => Err(wrap_provider_error(provider.name(), error)),
    }
}
