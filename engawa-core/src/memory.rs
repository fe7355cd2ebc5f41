//! Pre-flight memory estimation for boundary tables.
//!
//! Provides a conservative estimate of peak table memory so callers can
//! reject oversized or degenerate trees before any allocation occurs. The
//! estimate is intentionally pessimistic — a safety multiplier covers heap
//! fragmentation and the transient buffers the builder allocates per node.

use crate::leafset::LeafSetIndex;
use crate::tree::{Dendrogram, Node, NodeId};

/// Safety multiplier applied to the raw estimate. 1.5× balances avoiding
/// false positives against catching genuine exhaustion risks.
const SAFETY_MULTIPLIER_NUMERATOR: u64 = 3;
const SAFETY_MULTIPLIER_DENOMINATOR: u64 = 2;

/// Estimated bytes per boundary-table entry: the two-id key, the `f64` score,
/// and the hash-map slot plus control-byte overhead on 64-bit platforms.
const TABLE_ENTRY_BYTES: u64 = 64;

/// Size of one `f64` slot in the transient cross-similarity and
/// through-score buffers.
const F64_BYTES: u64 = 8;

/// Returns a conservative estimate of peak memory (in bytes) the boundary
/// tables for `tree` will require.
///
/// Every internal node with child leaf counts `p` and `q` contributes
/// `2·p·q` final entries; the transient cross-similarity matrix and
/// through-score row of the largest single combine step are added on top,
/// and a 1.5× safety multiplier is applied to the total. All arithmetic
/// saturates, so degenerate inputs cap at `u64::MAX` rather than wrapping.
///
/// # Examples
/// ```
/// use engawa_core::{DendrogramBuilder, LeafId, estimate_peak_bytes};
///
/// let mut builder = DendrogramBuilder::new();
/// let a = builder.leaf(LeafId::new(0));
/// let b = builder.leaf(LeafId::new(1));
/// let root = builder.merge(a, b, 1.0);
/// let tree = builder.build(root).expect("tree is well formed");
/// assert!(estimate_peak_bytes(&tree) > 0);
/// ```
#[must_use]
pub fn estimate_peak_bytes(tree: &Dendrogram) -> u64 {
    let index = LeafSetIndex::build(tree);

    let mut total_entries = 0_u64;
    let mut largest_combine = 0_u64;
    for position in 0..tree.node_count() {
        let node = NodeId::new(position);
        if let Node::Internal { left, right, .. } = *tree.node(node) {
            let p = index.leaf_count(left) as u64;
            let q = index.leaf_count(right) as u64;
            let cross = p.saturating_mul(q);
            total_entries = total_entries.saturating_add(cross.saturating_mul(2));
            largest_combine = largest_combine.max(cross);
        }
    }

    let tables = total_entries.saturating_mul(TABLE_ENTRY_BYTES);
    // Cross-similarity matrix plus one through-score row, live only while the
    // largest node combines.
    let transient = largest_combine
        .saturating_add(tree.leaf_count() as u64)
        .saturating_mul(F64_BYTES);

    tables
        .saturating_add(transient)
        .saturating_mul(SAFETY_MULTIPLIER_NUMERATOR)
        .saturating_div(SAFETY_MULTIPLIER_DENOMINATOR)
}

/// Formats a byte count as a human-readable string using binary units.
///
/// Returns values like `"0 B"`, `"1.0 KiB"`, `"2.4 GiB"`, with one decimal
/// place for values ≥ 1 KiB.
///
/// # Examples
/// ```
/// use engawa_core::format_bytes;
///
/// assert_eq!(format_bytes(0), "0 B");
/// assert_eq!(format_bytes(1024), "1.0 KiB");
/// assert_eq!(format_bytes(1_073_741_824), "1.0 GiB");
/// ```
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;
    const TIB: u64 = 1024 * GIB;

    if bytes >= TIB {
        format!("{:.1} TiB", bytes as f64 / TIB as f64)
    } else if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    use crate::tree::{DendrogramBuilder, LeafId};

    fn balanced_tree(leaves: u64) -> Dendrogram {
        let mut builder = DendrogramBuilder::new();
        let mut layer: Vec<_> = (0..leaves).map(|id| builder.leaf(LeafId::new(id))).collect();
        while layer.len() > 1 {
            layer = layer
                .chunks(2)
                .map(|pair| {
                    if pair.len() == 2 {
                        builder.merge(pair[0], pair[1], 1.0)
                    } else {
                        pair[0]
                    }
                })
                .collect();
        }
        builder.build(layer[0]).expect("balanced tree must be valid")
    }

    #[rstest]
    fn single_leaf_requires_no_table_memory() {
        let mut builder = DendrogramBuilder::new();
        let root = builder.leaf(LeafId::new(0));
        let tree = builder.build(root).expect("single leaf must be valid");
        assert_eq!(estimate_peak_bytes(&tree), 0);
    }

    #[rstest]
    #[case::four_vs_eight(4, 8)]
    #[case::eight_vs_thirty_two(8, 32)]
    fn estimate_grows_with_leaf_count(#[case] small: u64, #[case] large: u64) {
        let small_estimate = estimate_peak_bytes(&balanced_tree(small));
        let large_estimate = estimate_peak_bytes(&balanced_tree(large));
        assert!(
            large_estimate > small_estimate,
            "expected estimate for {large} leaves ({large_estimate}) to exceed {small} leaves ({small_estimate})"
        );
    }

    #[rstest]
    fn two_leaf_estimate_matches_hand_computation() {
        // One internal node: 2 entries of 64 bytes, 1 cross slot + 2 row
        // slots of 8 bytes, times 3/2.
        let estimate = estimate_peak_bytes(&balanced_tree(2));
        assert_eq!(estimate, (2 * 64 + 3 * 8) * 3 / 2);
    }

    #[rstest]
    #[case::zero(0, "0 B")]
    #[case::just_below_kib(1023, "1023 B")]
    #[case::one_kib(1024, "1.0 KiB")]
    #[case::one_and_half_kib(1536, "1.5 KiB")]
    #[case::one_mib(1_048_576, "1.0 MiB")]
    #[case::one_gib(1_073_741_824, "1.0 GiB")]
    #[case::one_tib(1_099_511_627_776, "1.0 TiB")]
    fn format_bytes_produces_expected_output(#[case] input: u64, #[case] expected: &str) {
        assert_eq!(format_bytes(input), expected);
    }
}
