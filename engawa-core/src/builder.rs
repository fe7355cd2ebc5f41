//! Builder utilities for configuring reordering runs.
//!
//! Exposes the execution strategy selection surface and builder validation
//! used before constructing [`Reorderer`] instances.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::Arc;

use crate::control::{CancellationToken, ProgressCallback};
use crate::error::{ReorderError, Result};
use crate::provider::Objective;
use crate::reorderer::Reorderer;

/// Indicates how [`Reorderer`] recurses over sibling subtrees when
/// [`Reorderer::run`] is invoked.
///
/// `Auto` resolves deterministically: it parallelizes when the `parallel`
/// feature is compiled in and falls back to sequential recursion otherwise,
/// so behaviour stays stable across builds. Results are bit-identical either
/// way.
///
/// # Examples
/// ```
/// use engawa_core::ExecutionStrategy;
///
/// let strategy = ExecutionStrategy::Auto;
/// assert!(matches!(strategy, ExecutionStrategy::Auto));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Allow the library to pick based on the compiled features.
    Auto,
    /// Force sequential recursion.
    Serial,
    /// Require the rayon-backed parallel recursion.
    Parallel,
}

/// Configures and constructs [`Reorderer`] instances.
///
/// # Examples
/// ```
/// use engawa_core::{ExecutionStrategy, Objective, ReordererBuilder};
///
/// let reorderer = ReordererBuilder::new()
///     .with_objective(Objective::MinimizeDistance)
///     .with_execution_strategy(ExecutionStrategy::Serial)
///     .build()
///     .expect("builder configuration is valid");
/// assert_eq!(reorderer.objective(), Objective::MinimizeDistance);
/// assert_eq!(reorderer.execution_strategy(), ExecutionStrategy::Serial);
/// ```
#[derive(Clone)]
pub struct ReordererBuilder {
    objective: Objective,
    execution_strategy: ExecutionStrategy,
    memory_budget: Option<u64>,
    cancellation: Option<CancellationToken>,
    progress: Option<ProgressCallback>,
}

impl Default for ReordererBuilder {
    fn default() -> Self {
        Self {
            objective: Objective::MaximizeSimilarity,
            execution_strategy: ExecutionStrategy::Auto,
            memory_budget: None,
            cancellation: None,
            progress: None,
        }
    }
}

impl fmt::Debug for ReordererBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReordererBuilder")
            .field("objective", &self.objective)
            .field("execution_strategy", &self.execution_strategy)
            .field("memory_budget", &self.memory_budget)
            .field("cancellation", &self.cancellation.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl ReordererBuilder {
    /// Creates a builder populated with default parameters.
    ///
    /// # Examples
    /// ```
    /// use engawa_core::{ExecutionStrategy, Objective, ReordererBuilder};
    ///
    /// let builder = ReordererBuilder::new();
    /// assert_eq!(builder.objective(), Objective::MaximizeSimilarity);
    /// assert_eq!(builder.execution_strategy(), ExecutionStrategy::Auto);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the optimization direction.
    #[must_use]
    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    /// Returns the configured objective.
    #[must_use]
    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Sets the execution strategy to use when running the algorithm.
    #[must_use]
    pub fn with_execution_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.execution_strategy = strategy;
        self
    }

    /// Returns the currently configured execution strategy.
    #[must_use]
    pub fn execution_strategy(&self) -> ExecutionStrategy {
        self.execution_strategy
    }

    /// Caps the estimated boundary-table memory; runs whose pre-flight
    /// estimate exceeds the budget are rejected before any allocation.
    #[must_use]
    pub fn with_memory_budget(mut self, budget: Option<u64>) -> Self {
        self.memory_budget = budget;
        self
    }

    /// Returns the configured memory budget, if any.
    #[must_use]
    pub fn memory_budget(&self) -> Option<u64> {
        self.memory_budget
    }

    /// Attaches a cancellation token checked at every internal-node visit.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Attaches a progress callback invoked with the fraction of leaves
    /// processed.
    #[must_use]
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Validates the configuration and constructs a [`Reorderer`].
    ///
    /// # Errors
    /// Returns [`ReorderError::InvalidMemoryBudget`] when a zero-byte budget
    /// was configured.
    pub fn build(self) -> Result<Reorderer> {
        let memory_budget = match self.memory_budget {
            None => None,
            Some(budget) => Some(
                NonZeroU64::new(budget).ok_or(ReorderError::InvalidMemoryBudget { got: budget })?,
            ),
        };

        Ok(Reorderer::new(
            self.objective,
            self.execution_strategy,
            memory_budget,
            self.cancellation,
            self.progress,
        ))
    }
}
