//! Top-down tree reconstruction.
//!
//! Consumes the boundary tables produced bottom-up and emits a new tree with
//! the same topology and possibly swapped children. The end-leaf pair that
//! achieved the best root score is threaded down through the recursion, so
//! every subtree is linearized for the boundary pair its parent context
//! requires; the swap decision at a node falls out of which child holds the
//! threaded left boundary. Ties favour the original child order, then the
//! smallest leaf-id pair.

use crate::error::{ReorderError, Result};
use crate::leafset::LeafSetIndex;
use crate::provider::{Objective, SimilarityProvider, checked_similarity};
use crate::tables::BoundaryTable;
use crate::tree::{Dendrogram, DendrogramBuilder, LeafId, Node, NodeId};

/// Rebuilds `tree` into its best-scoring orientation.
pub(crate) fn reconstruct<P>(
    tree: &Dendrogram,
    index: &LeafSetIndex,
    tables: &[BoundaryTable],
    provider: &P,
    objective: Objective,
) -> Result<Dendrogram>
where
    P: SimilarityProvider + ?Sized,
{
    let (left_end, right_end) = select_root_pair(tree, index, tables, objective)?;
    let ctx = Reconstructor {
        tree,
        index,
        tables,
        provider,
        objective,
    };
    let mut out = DendrogramBuilder::new();
    let new_root = ctx.assemble(tree.root(), left_end, right_end, &mut out)?;
    out.build(new_root).map_err(ReorderError::from)
}

#[derive(Clone, Copy)]
struct Candidate {
    score: f64,
    /// 0 when the pair keeps the original child order, 1 when it swaps.
    direction: u8,
    left: LeafId,
    right: LeafId,
}

fn preferred(objective: Objective, candidate: Candidate, incumbent: Candidate) -> bool {
    if objective.better(candidate.score, incumbent.score) {
        return true;
    }
    if candidate.score != incumbent.score {
        return false;
    }
    (candidate.direction, candidate.left, candidate.right)
        < (incumbent.direction, incumbent.left, incumbent.right)
}

/// Picks the end-leaf pair the whole tree will be linearized for.
fn select_root_pair(
    tree: &Dendrogram,
    index: &LeafSetIndex,
    tables: &[BoundaryTable],
    objective: Objective,
) -> Result<(LeafId, LeafId)> {
    let root = tree.root();
    match *tree.node(root) {
        Node::Leaf { id } => Ok((id, id)),
        Node::Internal { left, right, .. } => {
            let table = &tables[root.index()];
            let mut best: Option<Candidate> = None;
            let sides = [
                (index.leaves(left), index.leaves(right), 0_u8),
                (index.leaves(right), index.leaves(left), 1_u8),
            ];
            for (first, second, direction) in sides {
                for &i in first {
                    for &j in second {
                        let Some(score) = table.get(i, j) else {
                            continue;
                        };
                        let candidate = Candidate {
                            score,
                            direction,
                            left: i,
                            right: j,
                        };
                        if best.is_none_or(|incumbent| preferred(objective, candidate, incumbent)) {
                            best = Some(candidate);
                        }
                    }
                }
            }
            best.map(|candidate| (candidate.left, candidate.right))
                .ok_or(ReorderError::TableInvariant {
                    invariant: "root table is empty",
                    node: root.index(),
                })
        }
    }
}

struct Reconstructor<'a, P: ?Sized> {
    tree: &'a Dendrogram,
    index: &'a LeafSetIndex,
    tables: &'a [BoundaryTable],
    provider: &'a P,
    objective: Objective,
}

impl<P: SimilarityProvider + ?Sized> Reconstructor<'_, P> {
    /// Rebuilds `node` so its linearization runs from `left_end` to
    /// `right_end`, appending into `out`.
    fn assemble(
        &self,
        node: NodeId,
        left_end: LeafId,
        right_end: LeafId,
        out: &mut DendrogramBuilder,
    ) -> Result<NodeId> {
        match *self.tree.node(node) {
            Node::Leaf { id } => {
                if left_end != id || right_end != id {
                    return Err(ReorderError::TableInvariant {
                        invariant: "leaf boundary does not name the leaf",
                        node: node.index(),
                    });
                }
                Ok(out.leaf(id))
            }
            Node::Internal {
                left,
                right,
                height,
            } => {
                let (near, far) = if self.index.leaves(left).contains(&left_end) {
                    (left, right)
                } else {
                    (right, left)
                };
                let (junction_near, junction_far) =
                    self.select_junction(node, near, far, left_end, right_end)?;
                let near_built = self.assemble(near, left_end, junction_near, out)?;
                let far_built = self.assemble(far, junction_far, right_end, out)?;
                Ok(out.merge(near_built, far_built, height))
            }
        }
    }

    /// Selects the adjacent leaf pair at which the two children meet.
    fn select_junction(
        &self,
        parent: NodeId,
        near: NodeId,
        far: NodeId,
        left_end: LeafId,
        right_end: LeafId,
    ) -> Result<(LeafId, LeafId)> {
        let m_near = &self.tables[near.index()];
        let m_far = &self.tables[far.index()];
        let mut best: Option<(f64, LeafId, LeafId)> = None;
        for &h in self.index.leaves(near) {
            let Some(head) = m_near.get_oriented(left_end, h) else {
                continue;
            };
            for &l in self.index.leaves(far) {
                let Some(tail) = m_far.get_oriented(l, right_end) else {
                    continue;
                };
                let step = checked_similarity(self.provider, h, l)?;
                let total = head + step + tail;
                let replace = match best {
                    None => true,
                    Some((score, best_h, best_l)) => {
                        self.objective.better(total, score)
                            || (total == score && (h, l) < (best_h, best_l))
                    }
                };
                if replace {
                    best = Some((total, h, l));
                }
            }
        }
        best.map(|(_, h, l)| (h, l))
            .ok_or(ReorderError::TableInvariant {
                invariant: "no junction reaches the boundary pair",
                node: parent.index(),
            })
    }
}
