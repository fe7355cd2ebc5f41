//! JSON input loading for the engawa CLI.
//!
//! The input document carries the cluster tree, the leaf labels, and exactly
//! one pairwise source: a precomputed symmetric `matrix`, or dense feature
//! `vectors` compared by Euclidean distance. Labels are mapped to leaf ids by
//! their position in `labels`.

use std::io::Read;

use serde::Deserialize;

use engawa_core::{Dendrogram, DendrogramBuilder, LeafId, NodeId, TreeError};
use engawa_providers_dense::{DenseVectorProvider, DenseVectorProviderError};
use engawa_providers_matrix::{MatrixProvider, MatrixProviderError};

/// Errors surfaced while loading an input document.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// The document is not valid JSON or does not match the schema.
    #[error("failed to parse input document: {0}")]
    Json(#[from] serde_json::Error),
    /// The same label appears twice in `labels`.
    #[error("label `{label}` appears more than once")]
    DuplicateLabel {
        /// The repeated label.
        label: String,
    },
    /// The tree references a label absent from `labels`.
    #[error("tree references unknown label `{label}`")]
    UnknownLabel {
        /// The unmatched label.
        label: String,
    },
    /// A merge node does not have exactly two children.
    #[error("merge nodes require exactly 2 children (got {children})")]
    NotBinary {
        /// Number of children found on the offending merge.
        children: usize,
    },
    /// Neither `matrix` nor `vectors` was supplied.
    #[error("the document must carry either `matrix` or `vectors`")]
    MissingSource,
    /// Both `matrix` and `vectors` were supplied.
    #[error("the document must carry only one of `matrix` and `vectors`")]
    ConflictingSources,
    /// The assembled tree failed structural validation.
    #[error(transparent)]
    Tree(#[from] TreeError),
    /// Matrix provider construction failed.
    #[error(transparent)]
    Matrix(#[from] MatrixProviderError),
    /// Dense provider construction failed.
    #[error(transparent)]
    Dense(#[from] DenseVectorProviderError),
}

#[derive(Debug, Deserialize)]
struct InputDocument {
    labels: Vec<String>,
    tree: TreeSpec,
    #[serde(default)]
    matrix: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    vectors: Option<Vec<Vec<f64>>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TreeSpec {
    Leaf {
        leaf: String,
    },
    Merge {
        merge: Vec<TreeSpec>,
        #[serde(default)]
        height: f64,
    },
}

/// The pairwise source carried by an input document.
#[derive(Debug)]
pub enum InputSource {
    /// Precomputed symmetric table.
    Matrix(MatrixProvider),
    /// Dense feature vectors compared by Euclidean distance.
    Vectors(DenseVectorProvider),
}

/// A fully validated input: tree, labels, and pairwise source.
#[derive(Debug)]
pub struct LoadedInput {
    /// The cluster tree to reorder.
    pub tree: Dendrogram,
    /// Leaf labels; the index is the raw leaf id.
    pub labels: Vec<String>,
    /// The pairwise source.
    pub source: InputSource,
}

impl LoadedInput {
    /// Renders a leaf sequence back into labels.
    #[must_use]
    pub fn labels_for(&self, order: &[LeafId]) -> Vec<String> {
        order
            .iter()
            .map(|id| self.labels[id.get() as usize].clone())
            .collect()
    }
}

/// Reads and validates an input document.
///
/// # Errors
/// Returns [`InputError`] when the JSON is malformed, labels repeat or are
/// unknown, the tree is not binary, or provider construction fails.
pub fn load_input(reader: impl Read) -> Result<LoadedInput, InputError> {
    let document: InputDocument = serde_json::from_reader(reader)?;
    let ids: Vec<LeafId> = (0..document.labels.len() as u64).map(LeafId::new).collect();

    for (position, label) in document.labels.iter().enumerate() {
        if document.labels[..position].contains(label) {
            return Err(InputError::DuplicateLabel {
                label: label.clone(),
            });
        }
    }

    let mut builder = DendrogramBuilder::new();
    let root = build_spec(&document.tree, &document.labels, &mut builder)?;
    let tree = builder.build(root)?;

    let source = match (document.matrix, document.vectors) {
        (Some(matrix), None) => InputSource::Matrix(MatrixProvider::try_new(
            "matrix",
            ids,
            matrix,
        )?),
        (None, Some(vectors)) => InputSource::Vectors(DenseVectorProvider::try_new(
            "vectors",
            ids,
            vectors,
        )?),
        (None, None) => return Err(InputError::MissingSource),
        (Some(_), Some(_)) => return Err(InputError::ConflictingSources),
    };

    Ok(LoadedInput {
        tree,
        labels: document.labels,
        source,
    })
}

fn build_spec(
    spec: &TreeSpec,
    labels: &[String],
    builder: &mut DendrogramBuilder,
) -> Result<NodeId, InputError> {
    match spec {
        TreeSpec::Leaf { leaf } => {
            let position = labels.iter().position(|label| label == leaf).ok_or_else(|| {
                InputError::UnknownLabel {
                    label: leaf.clone(),
                }
            })?;
            Ok(builder.leaf(LeafId::new(position as u64)))
        }
        TreeSpec::Merge { merge, height } => {
            let [left, right] = merge.as_slice() else {
                return Err(InputError::NotBinary {
                    children: merge.len(),
                });
            };
            let left = build_spec(left, labels, builder)?;
            let right = build_spec(right, labels, builder)?;
            Ok(builder.merge(left, right, *height))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    const THREE_LEAVES: &str = r#"{
        "labels": ["A", "B", "C"],
        "tree": {"merge": [{"merge": [{"leaf": "A"}, {"leaf": "B"}], "height": 1.0},
                           {"leaf": "C"}],
                 "height": 2.0},
        "matrix": [[0, 1, 5], [1, 0, 1], [5, 1, 0]]
    }"#;

    #[rstest]
    fn loads_a_matrix_document() {
        let input = load_input(THREE_LEAVES.as_bytes()).expect("document must load");
        assert_eq!(input.tree.leaf_count(), 3);
        assert_eq!(input.labels, vec!["A", "B", "C"]);
        assert!(matches!(input.source, InputSource::Matrix(_)));
    }

    #[rstest]
    fn loads_a_vector_document() {
        let json = r#"{
            "labels": ["A", "B"],
            "tree": {"merge": [{"leaf": "A"}, {"leaf": "B"}]},
            "vectors": [[0.0, 0.0], [3.0, 4.0]]
        }"#;
        let input = load_input(json.as_bytes()).expect("document must load");
        assert!(matches!(input.source, InputSource::Vectors(_)));
    }

    #[rstest]
    fn rejects_duplicate_labels() {
        let json = r#"{
            "labels": ["A", "A"],
            "tree": {"merge": [{"leaf": "A"}, {"leaf": "A"}]},
            "matrix": [[0, 1], [1, 0]]
        }"#;
        let err = load_input(json.as_bytes()).expect_err("duplicate labels must fail");
        assert!(matches!(err, InputError::DuplicateLabel { label } if label == "A"));
    }

    #[rstest]
    fn rejects_unknown_tree_labels() {
        let json = r#"{
            "labels": ["A", "B"],
            "tree": {"merge": [{"leaf": "A"}, {"leaf": "Z"}]},
            "matrix": [[0, 1], [1, 0]]
        }"#;
        let err = load_input(json.as_bytes()).expect_err("unknown label must fail");
        assert!(matches!(err, InputError::UnknownLabel { label } if label == "Z"));
    }

    #[rstest]
    fn rejects_non_binary_merges() {
        let json = r#"{
            "labels": ["A", "B", "C"],
            "tree": {"merge": [{"leaf": "A"}, {"leaf": "B"}, {"leaf": "C"}]},
            "matrix": [[0, 1, 1], [1, 0, 1], [1, 1, 0]]
        }"#;
        let err = load_input(json.as_bytes()).expect_err("ternary merge must fail");
        assert!(matches!(err, InputError::NotBinary { children: 3 }));
    }

    #[rstest]
    fn rejects_missing_sources() {
        let json = r#"{
            "labels": ["A", "B"],
            "tree": {"merge": [{"leaf": "A"}, {"leaf": "B"}]}
        }"#;
        let err = load_input(json.as_bytes()).expect_err("missing source must fail");
        assert!(matches!(err, InputError::MissingSource));
    }

    #[rstest]
    fn rejects_conflicting_sources() {
        let json = r#"{
            "labels": ["A", "B"],
            "tree": {"merge": [{"leaf": "A"}, {"leaf": "B"}]},
            "matrix": [[0, 1], [1, 0]],
            "vectors": [[0.0], [1.0]]
        }"#;
        let err = load_input(json.as_bytes()).expect_err("two sources must fail");
        assert!(matches!(err, InputError::ConflictingSources));
    }

    #[rstest]
    fn rejects_duplicate_tree_leaves() {
        let json = r#"{
            "labels": ["A", "B"],
            "tree": {"merge": [{"leaf": "A"}, {"leaf": "A"}]},
            "matrix": [[0, 1], [1, 0]]
        }"#;
        let err = load_input(json.as_bytes()).expect_err("duplicate leaf must fail");
        assert!(matches!(err, InputError::Tree(TreeError::DuplicateLeafId { .. })));
    }

    #[rstest]
    fn renders_orders_back_into_labels() {
        let input = load_input(THREE_LEAVES.as_bytes()).expect("document must load");
        let rendered = input.labels_for(&[LeafId::new(1), LeafId::new(0), LeafId::new(2)]);
        assert_eq!(rendered, vec!["B", "A", "C"]);
    }
}
