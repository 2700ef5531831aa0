//! Batch Merkle reduction over a complete leaf list.

use crate::canonical::pair_and_hash;
use crate::digest::Digest;

/// Root of `leaves` by pairwise reduction. An odd layer duplicates its last node.
///
/// Returns the zero digest for no leaves and the leaf itself for a single leaf.
pub fn merkle(leaves: &[Digest]) -> Digest {
    if leaves.is_empty() {
        return Digest::ZERO;
    }

    let mut layer = leaves.to_vec();
    while layer.len() > 1 {
        if layer.len() % 2 == 1 {
            let last = layer[layer.len() - 1];
            layer.push(last);
        }
        layer = layer
            .chunks_exact(2)
            .map(|pair| pair_and_hash(&pair[0], &pair[1]))
            .collect();
    }
    layer[0]
}
