//! Per-node leaf-set index.
//!
//! The leaves under any node form a contiguous run of the tree's in-order
//! leaf sequence, so the index stores one `(offset, len)` range per node over
//! a single shared sequence instead of copying a set per node. Construction
//! is a single traversal; lookups are slices.

use crate::tree::{Dendrogram, LeafId, Node, NodeId};

enum Frame {
    Enter(NodeId),
    Exit(NodeId, usize),
}

/// Memoized leaf sets for every node of a [`Dendrogram`].
///
/// # Examples
/// ```
/// use engawa_core::{DendrogramBuilder, LeafId, LeafSetIndex};
///
/// let mut builder = DendrogramBuilder::new();
/// let a = builder.leaf(LeafId::new(1));
/// let b = builder.leaf(LeafId::new(2));
/// let root = builder.merge(a, b, 1.0);
/// let tree = builder.build(root).expect("tree is well formed");
///
/// let index = LeafSetIndex::build(&tree);
/// assert_eq!(index.leaf_count(root), 2);
/// assert_eq!(index.leaves(a), &[LeafId::new(1)]);
/// ```
#[derive(Clone, Debug)]
pub struct LeafSetIndex {
    order: Vec<LeafId>,
    ranges: Vec<(usize, usize)>,
}

impl LeafSetIndex {
    /// Computes the index for `tree` in a single post-order pass.
    #[must_use]
    pub fn build(tree: &Dendrogram) -> Self {
        let mut order = Vec::with_capacity(tree.node_count().div_ceil(2));
        let mut ranges = vec![(0, 0); tree.node_count()];
        let mut stack = vec![Frame::Enter(tree.root())];
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(node) => match *tree.node(node) {
                    Node::Leaf { id } => {
                        ranges[node.index()] = (order.len(), 1);
                        order.push(id);
                    }
                    Node::Internal { left, right, .. } => {
                        stack.push(Frame::Exit(node, order.len()));
                        stack.push(Frame::Enter(right));
                        stack.push(Frame::Enter(left));
                    }
                },
                Frame::Exit(node, start) => {
                    ranges[node.index()] = (start, order.len() - start);
                }
            }
        }
        Self { order, ranges }
    }

    /// Returns the leaf ids under `node`, in in-order sequence.
    #[must_use]
    pub fn leaves(&self, node: NodeId) -> &[LeafId] {
        let (start, len) = self.ranges[node.index()];
        &self.order[start..start + len]
    }

    /// Returns the number of leaves under `node`.
    #[must_use]
    pub fn leaf_count(&self, node: NodeId) -> usize {
        self.ranges[node.index()].1
    }

    /// Returns the full in-order leaf sequence of the tree.
    #[must_use]
    pub fn order(&self) -> &[LeafId] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    use crate::tree::DendrogramBuilder;

    fn skewed_tree() -> (Dendrogram, Vec<NodeId>) {
        // ((0, 1), 2), 3 — a left-leaning chain.
        let mut builder = DendrogramBuilder::new();
        let l0 = builder.leaf(LeafId::new(0));
        let l1 = builder.leaf(LeafId::new(1));
        let l2 = builder.leaf(LeafId::new(2));
        let l3 = builder.leaf(LeafId::new(3));
        let m0 = builder.merge(l0, l1, 1.0);
        let m1 = builder.merge(m0, l2, 2.0);
        let root = builder.merge(m1, l3, 3.0);
        let nodes = vec![l0, l1, l2, l3, m0, m1, root];
        (builder.build(root).expect("chain must be valid"), nodes)
    }

    #[rstest]
    fn ranges_cover_expected_leaves() {
        let (tree, nodes) = skewed_tree();
        let index = LeafSetIndex::build(&tree);
        let ids = |node: NodeId| -> Vec<u64> {
            index.leaves(node).iter().map(|id| id.get()).collect()
        };
        assert_eq!(ids(nodes[4]), vec![0, 1]);
        assert_eq!(ids(nodes[5]), vec![0, 1, 2]);
        assert_eq!(ids(nodes[6]), vec![0, 1, 2, 3]);
        assert_eq!(ids(nodes[3]), vec![3]);
    }

    #[rstest]
    fn parent_sets_are_disjoint_unions_of_children() {
        let (tree, nodes) = skewed_tree();
        let index = LeafSetIndex::build(&tree);
        for node in &nodes {
            if let Node::Internal { left, right, .. } = *tree.node(*node) {
                let mut union: Vec<LeafId> = index.leaves(left).to_vec();
                union.extend_from_slice(index.leaves(right));
                assert_eq!(union.len(), index.leaf_count(*node));
                let mut sorted = union.clone();
                sorted.sort_unstable();
                sorted.dedup();
                assert_eq!(sorted.len(), union.len(), "children must not share leaves");
                let mut parent: Vec<LeafId> = index.leaves(*node).to_vec();
                parent.sort_unstable();
                assert_eq!(parent, sorted);
            }
        }
    }

    #[rstest]
    fn order_matches_tree_leaf_order() {
        let (tree, _) = skewed_tree();
        let index = LeafSetIndex::build(&tree);
        assert_eq!(index.order(), tree.leaf_order().as_slice());
    }
}
