//! Shared fixtures for the engawa-core integration tests.
#![allow(dead_code)] // not every test binary uses every fixture

use std::collections::HashMap;

use engawa_core::{
    Dendrogram, DendrogramBuilder, LeafId, NodeId, ProviderError, SimilarityProvider,
};

/// In-memory symmetric pair table used as the test similarity source.
pub struct PairTable {
    name: String,
    values: HashMap<(u64, u64), f64>,
    ids: Vec<u64>,
}

impl PairTable {
    /// Builds a table from `(left, right, value)` triples; both orientations
    /// are stored.
    pub fn new(pairs: &[(u64, u64, f64)]) -> Self {
        Self::with_name("pair-table", pairs)
    }

    /// Builds a named table from `(left, right, value)` triples.
    pub fn with_name(name: &str, pairs: &[(u64, u64, f64)]) -> Self {
        let mut values = HashMap::new();
        let mut ids = Vec::new();
        for &(a, b, value) in pairs {
            values.insert((a, b), value);
            values.insert((b, a), value);
            ids.push(a);
            ids.push(b);
        }
        ids.sort_unstable();
        ids.dedup();
        Self {
            name: name.to_owned(),
            values,
            ids,
        }
    }

    /// Registers an id without any pair values, to provoke count mismatches.
    pub fn with_extra_id(mut self, id: u64) -> Self {
        if !self.ids.contains(&id) {
            self.ids.push(id);
            self.ids.sort_unstable();
        }
        self
    }
}

impl SimilarityProvider for PairTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn contains(&self, id: LeafId) -> bool {
        self.ids.binary_search(&id.get()).is_ok()
    }

    fn similarity(&self, a: LeafId, b: LeafId) -> Result<f64, ProviderError> {
        if a == b {
            return Ok(0.0);
        }
        self.values
            .get(&(a.get(), b.get()))
            .copied()
            .ok_or(ProviderError::MissingPair { left: a, right: b })
    }
}

/// Builds the three-leaf chain `((0, 1), 2)`.
pub fn three_leaf_chain() -> Dendrogram {
    let mut builder = DendrogramBuilder::new();
    let a = builder.leaf(LeafId::new(0));
    let b = builder.leaf(LeafId::new(1));
    let c = builder.leaf(LeafId::new(2));
    let inner = builder.merge(a, b, 1.0);
    let root = builder.merge(inner, c, 2.0);
    builder.build(root).expect("chain must be well formed")
}

/// Builds the balanced four-leaf tree `((a, b), (c, d))` over the given ids.
pub fn balanced_four(ids: [u64; 4]) -> Dendrogram {
    let mut builder = DendrogramBuilder::new();
    let leaves: Vec<NodeId> = ids.iter().map(|&id| builder.leaf(LeafId::new(id))).collect();
    let left = builder.merge(leaves[0], leaves[1], 1.0);
    let right = builder.merge(leaves[2], leaves[3], 1.0);
    let root = builder.merge(left, right, 2.0);
    builder.build(root).expect("balanced tree must be well formed")
}

/// Extracts the raw leaf ids of a sequence.
pub fn raw_order(order: &[LeafId]) -> Vec<u64> {
    order.iter().map(|id| id.get()).collect()
}
