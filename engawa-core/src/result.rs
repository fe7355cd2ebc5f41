//! Result type for reordering runs.

use crate::metrics::ReorderMetrics;
use crate::tree::{Dendrogram, LeafId};

/// The output of a [`crate::Reorderer::run`] invocation.
///
/// Holds the reordered tree (identical topology and leaf population to the
/// input, children possibly swapped per node), its in-order leaf sequence,
/// and the before/after adjacency sums.
#[derive(Clone, Debug, PartialEq)]
pub struct Reordering {
    tree: Dendrogram,
    leaf_order: Vec<LeafId>,
    metrics: ReorderMetrics,
}

impl Reordering {
    pub(crate) fn new(tree: Dendrogram, leaf_order: Vec<LeafId>, metrics: ReorderMetrics) -> Self {
        Self {
            tree,
            leaf_order,
            metrics,
        }
    }

    /// Returns the reordered tree.
    #[must_use]
    pub fn tree(&self) -> &Dendrogram {
        &self.tree
    }

    /// Returns the reordered in-order leaf sequence.
    #[must_use]
    pub fn leaf_order(&self) -> &[LeafId] {
        &self.leaf_order
    }

    /// Returns the before/after adjacency sums.
    #[must_use]
    pub fn metrics(&self) -> ReorderMetrics {
        self.metrics
    }

    /// Consumes the result, yielding the reordered tree.
    #[must_use]
    pub fn into_tree(self) -> Dendrogram {
        self.tree
    }
}
