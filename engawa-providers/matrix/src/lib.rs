//! Similarity provider backed by a precomputed symmetric pairwise table.

use std::collections::HashMap;

use engawa_core::{LeafId, ProviderError, SimilarityProvider};
use thiserror::Error;

/// Errors raised while constructing a [`MatrixProvider`].
#[derive(Debug, Error, PartialEq)]
pub enum MatrixProviderError {
    #[error("a matrix provider requires at least one record")]
    EmptyInput,
    #[error("leaf id {id} appears more than once")]
    DuplicateId { id: LeafId },
    #[error("{ids} ids were given but the matrix has {rows} rows")]
    RowCountMismatch { ids: usize, rows: usize },
    #[error("row {row} has length {actual} but expected {expected}")]
    RowLengthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("matrix value at ({row}, {column}) is not finite")]
    NonFiniteValue { row: usize, column: usize },
    #[error("matrix is not symmetric at ({row}, {column})")]
    Asymmetric { row: usize, column: usize },
}

/// Pairwise table provider over an `n×n` symmetric matrix.
///
/// The matrix may hold similarities or distances; pair it with the matching
/// [`engawa_core::Objective`] when running the reorderer.
///
/// # Examples
/// ```
/// use engawa_core::{LeafId, SimilarityProvider};
/// use engawa_providers_matrix::MatrixProvider;
///
/// let provider = MatrixProvider::try_new(
///     "demo",
///     vec![LeafId::new(0), LeafId::new(1)],
///     vec![vec![0.0, 2.0], vec![2.0, 0.0]],
/// )?;
/// assert_eq!(provider.len(), 2);
/// assert_eq!(provider.similarity(LeafId::new(1), LeafId::new(0))?, 2.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct MatrixProvider {
    name: String,
    ids: Vec<LeafId>,
    positions: HashMap<LeafId, usize>,
    values: Vec<f64>,
}

impl MatrixProvider {
    /// Validates and builds a provider from ids and a row-major matrix.
    ///
    /// # Errors
    /// Returns [`MatrixProviderError`] when the input is empty, an id
    /// repeats, the matrix is not square over the ids, a value is not
    /// finite, or the matrix is not symmetric.
    pub fn try_new(
        name: impl Into<String>,
        ids: Vec<LeafId>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, MatrixProviderError> {
        if ids.is_empty() {
            return Err(MatrixProviderError::EmptyInput);
        }
        if rows.len() != ids.len() {
            return Err(MatrixProviderError::RowCountMismatch {
                ids: ids.len(),
                rows: rows.len(),
            });
        }

        let mut positions = HashMap::with_capacity(ids.len());
        for (position, &id) in ids.iter().enumerate() {
            if positions.insert(id, position).is_some() {
                return Err(MatrixProviderError::DuplicateId { id });
            }
        }

        let n = ids.len();
        let mut values = Vec::with_capacity(n * n);
        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(MatrixProviderError::RowLengthMismatch {
                    row: row_index,
                    expected: n,
                    actual: row.len(),
                });
            }
            for (column, &value) in row.iter().enumerate() {
                if !value.is_finite() {
                    return Err(MatrixProviderError::NonFiniteValue {
                        row: row_index,
                        column,
                    });
                }
                values.push(value);
            }
        }

        for row in 0..n {
            for column in (row + 1)..n {
                if values[row * n + column] != values[column * n + row] {
                    return Err(MatrixProviderError::Asymmetric { row, column });
                }
            }
        }

        Ok(Self {
            name: name.into(),
            ids,
            positions,
            values,
        })
    }

    /// Returns the ids in row order.
    #[must_use]
    pub fn ids(&self) -> &[LeafId] {
        &self.ids
    }
}

impl SimilarityProvider for MatrixProvider {
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
        let row = *self
            .positions
            .get(&a)
            .ok_or(ProviderError::UnknownLeaf { id: a })?;
        let column = *self
            .positions
            .get(&b)
            .ok_or(ProviderError::UnknownLeaf { id: b })?;
        Ok(self.values[row * self.ids.len() + column])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    fn ids(raw: &[u64]) -> Vec<LeafId> {
        raw.iter().map(|&id| LeafId::new(id)).collect()
    }

    #[rstest]
    fn lookups_are_symmetric() {
        let provider = MatrixProvider::try_new(
            "matrix",
            ids(&[0, 1, 2]),
            vec![
                vec![0.0, 1.0, 5.0],
                vec![1.0, 0.0, 2.0],
                vec![5.0, 2.0, 0.0],
            ],
        )
        .expect("matrix must be valid");

        let forward = provider
            .similarity(LeafId::new(0), LeafId::new(2))
            .expect("lookup must succeed");
        let reverse = provider
            .similarity(LeafId::new(2), LeafId::new(0))
            .expect("lookup must succeed");
        assert_eq!(forward, 5.0);
        assert_eq!(forward, reverse);
    }

    #[rstest]
    fn unknown_leaf_is_reported() {
        let provider =
            MatrixProvider::try_new("matrix", ids(&[0]), vec![vec![0.0]]).expect("valid");
        let err = provider
            .similarity(LeafId::new(0), LeafId::new(9))
            .expect_err("unknown id must fail");
        assert!(matches!(err, ProviderError::UnknownLeaf { id } if id == LeafId::new(9)));
    }

    #[rstest]
    fn rejects_empty_input() {
        let result = MatrixProvider::try_new("matrix", Vec::new(), Vec::new());
        assert!(matches!(result, Err(MatrixProviderError::EmptyInput)));
    }

    #[rstest]
    fn rejects_duplicate_ids() {
        let result = MatrixProvider::try_new(
            "matrix",
            ids(&[1, 1]),
            vec![vec![0.0, 0.0], vec![0.0, 0.0]],
        );
        assert!(matches!(
            result,
            Err(MatrixProviderError::DuplicateId { id }) if id == LeafId::new(1)
        ));
    }

    #[rstest]
    fn rejects_row_count_mismatch() {
        let result = MatrixProvider::try_new("matrix", ids(&[0, 1]), vec![vec![0.0, 0.0]]);
        assert!(matches!(
            result,
            Err(MatrixProviderError::RowCountMismatch { ids: 2, rows: 1 })
        ));
    }

    #[rstest]
    fn rejects_ragged_rows() {
        let result =
            MatrixProvider::try_new("matrix", ids(&[0, 1]), vec![vec![0.0, 1.0], vec![1.0]]);
        assert!(matches!(
            result,
            Err(MatrixProviderError::RowLengthMismatch {
                row: 1,
                expected: 2,
                actual: 1
            })
        ));
    }

    #[rstest]
    fn rejects_non_finite_values() {
        let result = MatrixProvider::try_new(
            "matrix",
            ids(&[0, 1]),
            vec![vec![0.0, f64::NAN], vec![f64::NAN, 0.0]],
        );
        assert!(matches!(
            result,
            Err(MatrixProviderError::NonFiniteValue { row: 0, column: 1 })
        ));
    }

    #[rstest]
    fn rejects_asymmetry() {
        let result = MatrixProvider::try_new(
            "matrix",
            ids(&[0, 1]),
            vec![vec![0.0, 1.0], vec![2.0, 0.0]],
        );
        assert!(matches!(
            result,
            Err(MatrixProviderError::Asymmetric { row: 0, column: 1 })
        ));
    }
}
