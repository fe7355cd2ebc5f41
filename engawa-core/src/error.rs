//! Error types for the engawa core library.
//!
//! Defines the error enum exposed by the public API and a convenient result
//! alias. Every failure aborts the whole reordering run; partially built
//! boundary tables are discarded with the run.

use std::sync::Arc;

use thiserror::Error;

use crate::builder::ExecutionStrategy;
use crate::provider::{ProviderError, ProviderErrorCode};
use crate::tree::{LeafId, TreeError};

/// Error type produced when configuring or running [`crate::Reorderer`].
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ReorderError {
    /// The input tree failed structural validation.
    #[error("invalid dendrogram: {source}")]
    InvalidTree {
        /// Underlying structural violation.
        #[source]
        source: TreeError,
    },
    /// A tree leaf has no matching provider record.
    #[error("provider `{provider}` has no record for tree leaf {leaf}")]
    MissingRecord {
        /// Identifier of the provider missing the record.
        provider: Arc<str>,
        /// The uncovered tree leaf.
        leaf: LeafId,
    },
    /// The provider carries a different number of records than the tree has
    /// leaves.
    #[error("tree has {tree_leaves} leaves but provider `{provider}` covers {records} records")]
    RecordCountMismatch {
        /// Identifier of the mismatched provider.
        provider: Arc<str>,
        /// Number of leaves in the tree.
        tree_leaves: usize,
        /// Number of records the provider reports.
        records: usize,
    },
    /// A required leaf pair has no value in the provider.
    #[error("provider `{provider}` has no similarity for pair ({left}, {right})")]
    MissingSimilarity {
        /// Identifier of the provider missing the pair.
        provider: Arc<str>,
        /// First leaf of the required pair.
        left: LeafId,
        /// Second leaf of the required pair.
        right: LeafId,
    },
    /// A provider operation failed while running the algorithm.
    #[error("provider `{provider}` failed: {error}")]
    Provider {
        /// Identifier of the provider that produced the error.
        provider: Arc<str>,
        /// Underlying provider error bubbled up by the algorithm.
        #[source]
        error: ProviderError,
    },
    /// The caller requested cancellation mid-computation.
    #[error("reordering was cancelled")]
    Cancelled,
    /// The pre-flight memory estimate exceeded the configured budget.
    #[error(
        "estimated boundary-table memory of {estimated_bytes} bytes exceeds the budget of {budget_bytes} bytes"
    )]
    ResourceBudgetExceeded {
        /// Conservative peak-memory estimate for the run.
        estimated_bytes: u64,
        /// Caller-supplied budget.
        budget_bytes: u64,
    },
    /// A memory budget of zero bytes was configured.
    #[error("memory budget must be at least 1 byte (got {got})")]
    InvalidMemoryBudget {
        /// The invalid budget supplied by the caller.
        got: u64,
    },
    /// The requested execution strategy is unavailable in the current build.
    #[error("the requested execution strategy {requested:?} is not available in this build")]
    StrategyUnavailable {
        /// Strategy that could not be satisfied by the current build.
        requested: ExecutionStrategy,
    },
    /// An internal table invariant was violated, indicating a logic error.
    #[error("boundary-table invariant violated: {invariant} (node {node})")]
    TableInvariant {
        /// Name of the violated invariant to assist debugging.
        invariant: &'static str,
        /// Arena index of the node being processed.
        node: usize,
    },
}

impl From<TreeError> for ReorderError {
    fn from(source: TreeError) -> Self {
        Self::InvalidTree { source }
    }
}

impl ReorderError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> ReorderErrorCode {
        match self {
            Self::InvalidTree { .. } => ReorderErrorCode::InvalidTree,
            Self::MissingRecord { .. } => ReorderErrorCode::MissingRecord,
            Self::RecordCountMismatch { .. } => ReorderErrorCode::RecordCountMismatch,
            Self::MissingSimilarity { .. } => ReorderErrorCode::MissingSimilarity,
            Self::Provider { .. } => ReorderErrorCode::ProviderFailure,
            Self::Cancelled => ReorderErrorCode::Cancelled,
            Self::ResourceBudgetExceeded { .. } => ReorderErrorCode::ResourceBudgetExceeded,
            Self::InvalidMemoryBudget { .. } => ReorderErrorCode::InvalidMemoryBudget,
            Self::StrategyUnavailable { .. } => ReorderErrorCode::StrategyUnavailable,
            Self::TableInvariant { .. } => ReorderErrorCode::TableInvariant,
        }
    }

    /// Retrieves the inner [`ProviderErrorCode`] when the error originated in
    /// a [`crate::SimilarityProvider`].
    #[must_use]
    pub const fn provider_code(&self) -> Option<ProviderErrorCode> {
        match self {
            Self::Provider { error, .. } => Some(error.code()),
            _ => None,
        }
    }
}

/// Machine-readable error codes for [`ReorderError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ReorderErrorCode {
    /// The input tree failed structural validation.
    InvalidTree,
    /// A tree leaf has no matching provider record.
    MissingRecord,
    /// Tree leaf count and provider record count differ.
    RecordCountMismatch,
    /// A required leaf pair has no value in the provider.
    MissingSimilarity,
    /// A provider operation failed.
    ProviderFailure,
    /// The caller requested cancellation.
    Cancelled,
    /// The pre-flight memory estimate exceeded the budget.
    ResourceBudgetExceeded,
    /// A zero memory budget was configured.
    InvalidMemoryBudget,
    /// The requested execution strategy is unavailable.
    StrategyUnavailable,
    /// An internal table invariant was violated.
    TableInvariant,
}

impl ReorderErrorCode {
    /// Returns the symbolic identifier for logging and metrics surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidTree => "REORDER_INVALID_TREE",
            Self::MissingRecord => "REORDER_MISSING_RECORD",
            Self::RecordCountMismatch => "REORDER_RECORD_COUNT_MISMATCH",
            Self::MissingSimilarity => "REORDER_MISSING_SIMILARITY",
            Self::ProviderFailure => "REORDER_PROVIDER_FAILURE",
            Self::Cancelled => "REORDER_CANCELLED",
            Self::ResourceBudgetExceeded => "REORDER_RESOURCE_BUDGET_EXCEEDED",
            Self::InvalidMemoryBudget => "REORDER_INVALID_MEMORY_BUDGET",
            Self::StrategyUnavailable => "REORDER_STRATEGY_UNAVAILABLE",
            Self::TableInvariant => "REORDER_TABLE_INVARIANT",
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, ReorderError>;

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::cancelled(ReorderError::Cancelled, "REORDER_CANCELLED")]
    #[case::missing(
        ReorderError::MissingSimilarity {
            provider: Arc::from("matrix"),
            left: LeafId::new(1),
            right: LeafId::new(2),
        },
        "REORDER_MISSING_SIMILARITY"
    )]
    #[case::budget(
        ReorderError::ResourceBudgetExceeded { estimated_bytes: 10, budget_bytes: 5 },
        "REORDER_RESOURCE_BUDGET_EXCEEDED"
    )]
    fn error_codes_are_stable(#[case] error: ReorderError, #[case] expected: &str) {
        assert_eq!(error.code().as_str(), expected);
    }

    #[rstest]
    fn provider_code_surfaces_inner_code() {
        let error = ReorderError::Provider {
            provider: Arc::from("matrix"),
            error: ProviderError::NonFinite {
                left: LeafId::new(0),
                right: LeafId::new(1),
            },
        };
        assert_eq!(error.provider_code(), Some(ProviderErrorCode::NonFinite));
        assert_eq!(ReorderError::Cancelled.provider_code(), None);
    }
}
