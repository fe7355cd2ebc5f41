//! Core reordering orchestration.
//!
//! Provides the [`Reorderer`] entry point: pre-flight record matching and
//! memory-budget checks, then the before-metric, table build, reconstruction
//! and after-metric pipeline.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::builder::ExecutionStrategy;
use crate::control::{CancellationToken, ProgressCallback, RunControl};
use crate::error::{ReorderError, Result};
use crate::leafset::LeafSetIndex;
use crate::memory::estimate_peak_bytes;
use crate::metrics::{ReorderMetrics, adjacency_sum};
use crate::provider::{Objective, SimilarityProvider};
use crate::rebuild::reconstruct;
use crate::result::Reordering;
use crate::tables::build_tables;
use crate::tree::{Dendrogram, LeafId};

/// Entry point for running the leaf-reordering pipeline.
///
/// # Examples
/// ```
/// use engawa_core::{
///     DendrogramBuilder, LeafId, ProviderError, ReordererBuilder, SimilarityProvider,
/// };
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
/// let mut builder = DendrogramBuilder::new();
/// let a = builder.leaf(LeafId::new(0));
/// let b = builder.leaf(LeafId::new(1));
/// let root = builder.merge(a, b, 1.0);
/// let tree = builder.build(root).expect("tree is well formed");
///
/// let reorderer = ReordererBuilder::new().build().expect("defaults are valid");
/// let result = reorderer.run(&tree, &Ruler(vec![1.0, 4.0])).expect("run must succeed");
/// assert_eq!(result.leaf_order().len(), 2);
/// assert_eq!(result.metrics().adjacency_after(), 3.0);
/// ```
#[derive(Clone)]
pub struct Reorderer {
    objective: Objective,
    execution_strategy: ExecutionStrategy,
    memory_budget: Option<NonZeroU64>,
    cancellation: Option<CancellationToken>,
    progress: Option<ProgressCallback>,
}

impl fmt::Debug for Reorderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reorderer")
            .field("objective", &self.objective)
            .field("execution_strategy", &self.execution_strategy)
            .field("memory_budget", &self.memory_budget)
            .field("cancellation", &self.cancellation.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Reorderer {
    pub(crate) fn new(
        objective: Objective,
        execution_strategy: ExecutionStrategy,
        memory_budget: Option<NonZeroU64>,
        cancellation: Option<CancellationToken>,
        progress: Option<ProgressCallback>,
    ) -> Self {
        Self {
            objective,
            execution_strategy,
            memory_budget,
            cancellation,
            progress,
        }
    }

    /// Returns the optimization direction configured for this instance.
    #[must_use]
    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Returns the execution strategy that will be used when running.
    #[must_use]
    pub fn execution_strategy(&self) -> ExecutionStrategy {
        self.execution_strategy
    }

    /// Returns the configured memory budget, if any.
    #[must_use]
    pub fn memory_budget(&self) -> Option<NonZeroU64> {
        self.memory_budget
    }

    /// Executes the reordering pipeline against the provided tree and
    /// [`SimilarityProvider`].
    ///
    /// # Errors
    /// Returns [`ReorderError::MissingRecord`] or
    /// [`ReorderError::RecordCountMismatch`] when tree leaves and provider
    /// records do not match one-to-one, [`ReorderError::MissingSimilarity`]
    /// when a required pair has no value,
    /// [`ReorderError::ResourceBudgetExceeded`] when the pre-flight estimate
    /// exceeds the configured budget, [`ReorderError::Cancelled`] on
    /// cooperative cancellation, and [`ReorderError::StrategyUnavailable`]
    /// when a parallel run is requested from a build without the `parallel`
    /// feature.
    pub fn run<P>(&self, tree: &Dendrogram, provider: &P) -> Result<Reordering>
    where
        P: SimilarityProvider + Sync + ?Sized,
    {
        let leaves = tree.leaf_count();
        self.run_with_count(tree, provider, leaves)
    }

    #[instrument(
        name = "core.reorder",
        err,
        skip(self, tree, provider),
        fields(
            provider = %provider.name(),
            leaves = leaves,
            objective = ?self.objective,
            strategy = ?self.execution_strategy,
        ),
    )]
    fn run_with_count<P>(
        &self,
        tree: &Dendrogram,
        provider: &P,
        leaves: usize,
    ) -> Result<Reordering>
    where
        P: SimilarityProvider + Sync + ?Sized,
    {
        let order = tree.leaf_order();
        self.verify_records(&order, provider, leaves)?;
        self.check_budget(tree)?;

        if leaves == 1 {
            info!("tree has a single leaf, nothing to reorder");
            return Ok(Reordering::new(
                tree.clone(),
                order,
                ReorderMetrics::new(0.0, 0.0),
            ));
        }

        let parallel = self.resolve_parallelism()?;
        let index = LeafSetIndex::build(tree);
        let before = adjacency_sum(&order, provider)?;

        let control = RunControl::new(self.cancellation.clone(), self.progress.clone(), leaves);
        let tables = build_tables(tree, &index, provider, self.objective, &control, parallel)?;
        let rebuilt = reconstruct(tree, &index, &tables, provider, self.objective)?;
        drop(tables);

        let new_order = rebuilt.leaf_order();
        let after = adjacency_sum(&new_order, provider)?;
        info!(before, after, "reordering completed");

        Ok(Reordering::new(
            rebuilt,
            new_order,
            ReorderMetrics::new(before, after),
        ))
    }

    fn verify_records<P>(&self, order: &[LeafId], provider: &P, leaves: usize) -> Result<()>
    where
        P: SimilarityProvider + ?Sized,
    {
        for &leaf in order {
            if !provider.contains(leaf) {
                return Err(ReorderError::MissingRecord {
                    provider: Arc::from(provider.name()),
                    leaf,
                });
            }
        }
        // Leaf ids are unique, so full coverage plus equal counts implies a
        // one-to-one match.
        if provider.len() != leaves {
            warn!(
                provider = provider.name(),
                records = provider.len(),
                leaves,
                "provider record count does not match the tree"
            );
            return Err(ReorderError::RecordCountMismatch {
                provider: Arc::from(provider.name()),
                tree_leaves: leaves,
                records: provider.len(),
            });
        }
        Ok(())
    }

    fn check_budget(&self, tree: &Dendrogram) -> Result<()> {
        let Some(budget) = self.memory_budget else {
            return Ok(());
        };
        let estimated = estimate_peak_bytes(tree);
        if estimated > budget.get() {
            return Err(ReorderError::ResourceBudgetExceeded {
                estimated_bytes: estimated,
                budget_bytes: budget.get(),
            });
        }
        Ok(())
    }

    #[cfg(feature = "parallel")]
    fn resolve_parallelism(&self) -> Result<bool> {
        Ok(match self.execution_strategy {
            ExecutionStrategy::Serial => false,
            ExecutionStrategy::Auto | ExecutionStrategy::Parallel => true,
        })
    }

    #[cfg(not(feature = "parallel"))]
    fn resolve_parallelism(&self) -> Result<bool> {
        match self.execution_strategy {
            ExecutionStrategy::Serial | ExecutionStrategy::Auto => Ok(false),
            ExecutionStrategy::Parallel => Err(ReorderError::StrategyUnavailable {
                requested: ExecutionStrategy::Parallel,
            }),
        }
    }
}
