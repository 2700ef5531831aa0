//! Frontier consistency checks for persisted accumulators.
//!
//! A stored frontier is only trusted after it has been re-derived from its own nodes: the
//! realized subtrees are folded bottom-up exactly as `append` would, and the result must be
//! the stored root with no node left over.

use tracing::debug;

use crate::canonical::pair_and_hash;
use crate::digest::Digest;
use crate::error::MerkleError;
use crate::incremental::{max_depth, MAX_LEAF_COUNT};

/// Number of frontier nodes an accumulator over `leaf_count` leaves must hold
pub fn expected_frontier_len(leaf_count: u64) -> usize {
    match leaf_count {
        0 => 0,
        n if n.is_power_of_two() => 1,
        n => n.count_ones() as usize + 1,
    }
}

/// Check that `active_nodes` is a consistent frontier for `leaf_count` leaves.
///
/// The root (last node) must equal the fold of the realized subtrees below it. Every other
/// node is consumed in order; anything missing or left over is structural corruption.
pub fn validate_frontier(active_nodes: &[Digest], leaf_count: u64) -> Result<(), MerkleError> {
    if leaf_count > MAX_LEAF_COUNT {
        return Err(reject(format!(
            "{leaf_count} leaves exceed the accumulator capacity of {MAX_LEAF_COUNT}"
        )));
    }
    let expected = expected_frontier_len(leaf_count);
    if active_nodes.len() != expected {
        return Err(reject(format!(
            "{} leaves require {expected} frontier nodes, found {}",
            leaf_count,
            active_nodes.len()
        )));
    }

    let Some((root, realized)) = active_nodes.split_last() else {
        // Empty accumulator
        return Ok(());
    };
    if realized.is_empty() {
        // Perfect tree: the root is the only node
        return Ok(());
    }

    let mut index = leaf_count;
    let mut nodes = realized.iter();
    let mut top: Option<Digest> = None;

    for _ in 1..max_depth(leaf_count) {
        top = if index & 0x1 == 1 {
            match top {
                None => {
                    let left = next_node(&mut nodes)?;
                    Some(pair_and_hash(left, left))
                }
                Some(partial) => Some(pair_and_hash(&partial, &partial)),
            }
        } else {
            match top {
                Some(partial) => {
                    let left = next_node(&mut nodes)?;
                    Some(pair_and_hash(left, &partial))
                }
                None => None,
            }
        };
        index = (index + 1) >> 1;
    }

    let unused = nodes.len();
    if unused != 0 {
        return Err(reject(format!("{unused} frontier nodes left unconsumed")));
    }
    match top {
        Some(derived) if derived == *root => Ok(()),
        Some(derived) => Err(reject(format!(
            "stored root {root} does not match derived root {derived}"
        ))),
        None => Err(reject("frontier did not produce a root".to_string())),
    }
}

fn next_node<'a>(nodes: &mut std::slice::Iter<'a, Digest>) -> Result<&'a Digest, MerkleError> {
    nodes
        .next()
        .ok_or_else(|| reject("frontier exhausted before reaching the root".to_string()))
}

fn reject(reason: String) -> MerkleError {
    debug!("Rejecting accumulator frontier: {}", reason);
    MerkleError::StructuralCorruption(reason)
}
