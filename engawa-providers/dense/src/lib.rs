//! Similarity provider computing Euclidean distances over dense vectors.

use std::collections::HashMap;

use engawa_core::{LeafId, ProviderError, SimilarityProvider};
use thiserror::Error;

/// Errors raised while constructing a [`DenseVectorProvider`].
#[derive(Debug, Error, PartialEq)]
pub enum DenseVectorProviderError {
    #[error("a dense provider requires at least one record")]
    EmptyInput,
    #[error("feature vectors must have positive dimension")]
    ZeroDimension,
    #[error("leaf id {id} appears more than once")]
    DuplicateId { id: LeafId },
    #[error("{ids} ids were given but {rows} vectors were supplied")]
    RowCountMismatch { ids: usize, rows: usize },
    #[error("row {row} has length {actual} but expected {expected}")]
    RowLengthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("row {row} contains a non-finite component at position {component}")]
    NonFiniteComponent { row: usize, component: usize },
}

/// On-demand Euclidean distance provider over row-major feature vectors.
///
/// Distances grow with dissimilarity, so pair this provider with
/// [`engawa_core::Objective::MinimizeDistance`].
///
/// # Examples
/// ```
/// use engawa_core::{LeafId, SimilarityProvider};
/// use engawa_providers_dense::DenseVectorProvider;
///
/// let provider = DenseVectorProvider::try_new(
///     "demo",
///     vec![LeafId::new(0), LeafId::new(1)],
///     vec![vec![0.0, 0.0], vec![3.0, 4.0]],
/// )?;
/// assert_eq!(provider.similarity(LeafId::new(0), LeafId::new(1))?, 5.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct DenseVectorProvider {
    name: String,
    ids: Vec<LeafId>,
    positions: HashMap<LeafId, usize>,
    dimension: usize,
    values: Vec<f64>,
}

impl DenseVectorProvider {
    /// Validates and builds a provider from ids and equal-length feature
    /// rows.
    ///
    /// # Errors
    /// Returns [`DenseVectorProviderError`] when the input is empty, the
    /// dimension is zero, an id repeats, rows are ragged, or a component is
    /// not finite.
    pub fn try_new(
        name: impl Into<String>,
        ids: Vec<LeafId>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, DenseVectorProviderError> {
        if ids.is_empty() {
            return Err(DenseVectorProviderError::EmptyInput);
        }
        if rows.len() != ids.len() {
            return Err(DenseVectorProviderError::RowCountMismatch {
                ids: ids.len(),
                rows: rows.len(),
            });
        }
        let dimension = rows[0].len();
        if dimension == 0 {
            return Err(DenseVectorProviderError::ZeroDimension);
        }

        let mut positions = HashMap::with_capacity(ids.len());
        for (position, &id) in ids.iter().enumerate() {
            if positions.insert(id, position).is_some() {
                return Err(DenseVectorProviderError::DuplicateId { id });
            }
        }

        let mut values = Vec::with_capacity(ids.len() * dimension);
        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != dimension {
                return Err(DenseVectorProviderError::RowLengthMismatch {
                    row: row_index,
                    expected: dimension,
                    actual: row.len(),
                });
            }
            for (component, &value) in row.iter().enumerate() {
                if !value.is_finite() {
                    return Err(DenseVectorProviderError::NonFiniteComponent {
                        row: row_index,
                        component,
                    });
                }
                values.push(value);
            }
        }

        Ok(Self {
            name: name.into(),
            ids,
            positions,
            dimension,
            values,
        })
    }

    /// Returns the dimensionality of each feature vector.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Returns the ids in row order.
    #[must_use]
    pub fn ids(&self) -> &[LeafId] {
        &self.ids
    }

    fn row(&self, position: usize) -> &[f64] {
        &self.values[position * self.dimension..(position + 1) * self.dimension]
    }
}

impl SimilarityProvider for DenseVectorProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn contains(&self, id: LeafId) -> bool {
        self.positions.contains_key(&id)
    }

    fn similarity(&self, a: LeafId, b: LeafId) -> Result<f64, ProviderError> {
        let left = *self
            .positions
            .get(&a)
            .ok_or(ProviderError::UnknownLeaf { id: a })?;
        let right = *self
            .positions
            .get(&b)
            .ok_or(ProviderError::UnknownLeaf { id: b })?;
        let sum: f64 = self
            .row(left)
            .iter()
            .zip(self.row(right))
            .map(|(x, y)| {
                let delta = x - y;
                delta * delta
            })
            .sum();
        Ok(sum.sqrt())
    }
}
