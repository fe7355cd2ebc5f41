//! Engawa core library.
//!
//! Reorders the leaves of a binary hierarchical-clustering tree without
//! altering its cluster topology, so that numerically similar leaves end up
//! adjacent in the final left-to-right leaf sequence.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod builder;
#[cfg(feature = "cache")]
mod cache;
mod control;
mod error;
mod leafset;
mod memory;
mod metrics;
mod provider;
mod rebuild;
mod reorderer;
mod result;
mod tables;
mod tree;

pub use crate::{
    builder::{ExecutionStrategy, ReordererBuilder},
    control::{CancellationToken, ProgressCallback},
    error::{ReorderError, ReorderErrorCode, Result},
    leafset::LeafSetIndex,
    memory::{estimate_peak_bytes, format_bytes},
    metrics::{ReorderMetrics, adjacency_sum},
    provider::{Objective, ProviderError, ProviderErrorCode, SimilarityProvider},
    reorderer::Reorderer,
    result::Reordering,
    tree::{Dendrogram, DendrogramBuilder, LeafId, Node, NodeId, TreeError, TreeErrorCode},
};

#[cfg(feature = "cache")]
#[cfg_attr(docsrs, doc(cfg(feature = "cache")))]
pub use crate::cache::{CacheConfig, CachedProvider};
