//! Bottom-up boundary-table construction.
//!
//! For every node the builder produces a table mapping ordered pairs of end
//! leaves to the best achievable adjacency score for a linearization of that
//! node's subtree with those leaves at its outer ends. Tables are owned per
//! node; there is no global map. The recursion over the two children of an
//! internal node is independent and, under the `parallel` feature, dispatched
//! through `rayon::join` — the join is the only synchronization point, each
//! child's table is complete before the combine step reads it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::control::RunControl;
use crate::error::{ReorderError, Result};
use crate::leafset::LeafSetIndex;
use crate::provider::{Objective, ProviderError, SimilarityProvider, wrap_provider_error};
use crate::tree::{Dendrogram, LeafId, Node, NodeId};

/// Per-node map from ordered end-leaf pairs to the best adjacency score.
///
/// Values are symmetric under key reversal (reversing a linearization leaves
/// its adjacency sum unchanged); both orientations are stored so lookups can
/// present the pair either way round.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct BoundaryTable {
    entries: HashMap<(LeafId, LeafId), f64>,
}

impl BoundaryTable {
    /// Builds the base table for a leaf: a single zero-score self pair.
    pub(crate) fn leaf(id: LeafId) -> Self {
        let mut entries = HashMap::with_capacity(1);
        entries.insert((id, id), 0.0);
        Self { entries }
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    fn insert(&mut self, left: LeafId, right: LeafId, score: f64) {
        self.entries.insert((left, right), score);
    }

    /// Looks up the score for ends `(left, right)` in stored orientation.
    pub(crate) fn get(&self, left: LeafId, right: LeafId) -> Option<f64> {
        self.entries.get(&(left, right)).copied()
    }

    /// Looks up the score for an end pair regardless of orientation.
    pub(crate) fn get_oriented(&self, a: LeafId, b: LeafId) -> Option<f64> {
        self.get(a, b).or_else(|| self.get(b, a))
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Tables for a subtree, indexed by arena position; the subtree's own table
/// is always the final element.
type BuiltTables = Vec<(usize, BoundaryTable)>;

/// Dense similarity matrix between the leaves of two sibling subtrees.
struct CrossSims {
    values: Vec<f64>,
    cols: usize,
}

impl CrossSims {
    fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }
}

/// Builds one [`BoundaryTable`] per node, bottom-up.
///
/// Returns the tables indexed by arena position. Cancellation is checked at
/// every internal-node visit; progress is reported per processed leaf.
pub(crate) fn build_tables<P>(
    tree: &Dendrogram,
    index: &LeafSetIndex,
    provider: &P,
    objective: Objective,
    control: &RunControl,
    parallel: bool,
) -> Result<Vec<BoundaryTable>>
where
    P: SimilarityProvider + Sync + ?Sized,
{
    let builder = TableBuilder {
        tree,
        index,
        provider,
        objective,
        control,
        parallel,
    };
    let built = builder.build_node(tree.root())?;

    let mut tables: Vec<Option<BoundaryTable>> = Vec::new();
    tables.resize_with(tree.node_count(), || None);
    for (node, table) in built {
        if tables[node].replace(table).is_some() {
            return Err(ReorderError::TableInvariant {
                invariant: "node table built twice",
                node,
            });
        }
    }
    tables
        .into_iter()
        .enumerate()
        .map(|(node, slot)| {
            slot.ok_or(ReorderError::TableInvariant {
                invariant: "node table missing",
                node,
            })
        })
        .collect()
}

struct TableBuilder<'a, P: ?Sized> {
    tree: &'a Dendrogram,
    index: &'a LeafSetIndex,
    provider: &'a P,
    objective: Objective,
    control: &'a RunControl,
    parallel: bool,
}

impl<P: SimilarityProvider + Sync + ?Sized> TableBuilder<'_, P> {
    fn build_node(&self, node: NodeId) -> Result<BuiltTables> {
        match *self.tree.node(node) {
            Node::Leaf { id } => {
                self.control.record_leaf();
                Ok(vec![(node.index(), BoundaryTable::leaf(id))])
            }
            Node::Internal { left, right, .. } => {
                self.control.check_cancelled()?;
                let (left_built, right_built) = self.build_children(left, right)?;
                let table = {
                    let m_left = own_table(&left_built, left)?;
                    let m_right = own_table(&right_built, right)?;
                    self.combine(node, left, right, m_left, m_right)?
                };
                let mut built = left_built;
                built.extend(right_built);
                built.push((node.index(), table));
                Ok(built)
            }
        }
    }

    #[cfg(feature = "parallel")]
    fn build_children(&self, left: NodeId, right: NodeId) -> Result<(BuiltTables, BuiltTables)> {
        if self.parallel {
            let (left_built, right_built) =
                rayon::join(|| self.build_node(left), || self.build_node(right));
            Ok((left_built?, right_built?))
        } else {
            Ok((self.build_node(left)?, self.build_node(right)?))
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn build_children(&self, left: NodeId, right: NodeId) -> Result<(BuiltTables, BuiltTables)> {
        // Sequential fallback; `parallel` is always false without the feature.
        let _ = self.parallel;
        Ok((self.build_node(left)?, self.build_node(right)?))
    }

    fn combine(
        &self,
        node: NodeId,
        left: NodeId,
        right: NodeId,
        m_left: &BoundaryTable,
        m_right: &BoundaryTable,
    ) -> Result<BoundaryTable> {
        let w = self.index.leaves(left);
        let x = self.index.leaves(right);
        let cross = self.cross_similarities(w, x)?;

        let mut table = BoundaryTable::with_capacity(2 * w.len() * x.len());
        self.populate_direction(&mut table, node, w, x, m_left, m_right, |h, l| cross.get(h, l))?;
        self.populate_direction(&mut table, node, x, w, m_right, m_left, |h, l| cross.get(l, h))?;
        Ok(table)
    }

    /// Populates every entry `(i, j)` with `i` drawn from `near` and `j` from
    /// `far`: first the through-scores `T(i, l) = best over h of
    /// sim(h, l) + M_near(i, h)`, then `M(i, j) = best over l of
    /// T(i, l) + M_far(l, j)`.
    fn populate_direction(
        &self,
        table: &mut BoundaryTable,
        node: NodeId,
        near: &[LeafId],
        far: &[LeafId],
        m_near: &BoundaryTable,
        m_far: &BoundaryTable,
        sim: impl Fn(usize, usize) -> f64,
    ) -> Result<()> {
        let mut through = vec![0.0_f64; far.len()];
        for &i in near {
            for slot in &mut through {
                *slot = self.objective.identity();
            }
            for (h_pos, &h) in near.iter().enumerate() {
                let Some(inner) = m_near.get(i, h) else {
                    continue;
                };
                for (l_pos, slot) in through.iter_mut().enumerate() {
                    let candidate = inner + sim(h_pos, l_pos);
                    if self.objective.better(candidate, *slot) {
                        *slot = candidate;
                    }
                }
            }
            for &j in far {
                let mut best = self.objective.identity();
                for (l_pos, &l) in far.iter().enumerate() {
                    let Some(tail) = m_far.get(l, j) else {
                        continue;
                    };
                    let candidate = through[l_pos] + tail;
                    if self.objective.better(candidate, best) {
                        best = candidate;
                    }
                }
                if !best.is_finite() {
                    return Err(ReorderError::TableInvariant {
                        invariant: "no linearization reaches boundary pair",
                        node: node.index(),
                    });
                }
                table.insert(i, j, best);
            }
        }
        Ok(())
    }

    fn cross_similarities(&self, near: &[LeafId], far: &[LeafId]) -> Result<CrossSims> {
        let mut values = vec![0.0_f64; near.len() * far.len()];
        for (h_pos, &h) in near.iter().enumerate() {
            let row = &mut values[h_pos * far.len()..(h_pos + 1) * far.len()];
            self.provider
                .similarity_batch(h, far, row)
                .map_err(|error| wrap_provider_error(self.provider.name(), error))?;
            for (l_pos, value) in row.iter().enumerate() {
                if !value.is_finite() {
                    return Err(ReorderError::Provider {
                        provider: Arc::from(self.provider.name()),
                        error: ProviderError::NonFinite {
                            left: h,
                            right: far[l_pos],
                        },
                    });
                }
            }
        }
        Ok(CrossSims {
            values,
            cols: far.len(),
        })
    }
}

fn own_table(built: &BuiltTables, child: NodeId) -> Result<&BoundaryTable> {
    match built.last() {
        Some((node, table)) if *node == child.index() => Ok(table),
        _ => Err(ReorderError::TableInvariant {
            invariant: "child table is not the final element",
            node: child.index(),
        }),
    }
}
