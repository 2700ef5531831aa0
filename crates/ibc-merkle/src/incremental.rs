//! Incremental Merkle accumulator.
//!
//! The accumulator keeps only the active frontier: one fully realized digest per level
//! whose subtree still waits for a right sibling, followed by the current root. Appending
//! a leaf costs O(log n) hashes and the root is read in O(1).
//!
//! Layers count from the bottom (leaves are layer 1), depth counts from the top (root is
//! depth 1):
//!
//! ```text
//!                  * root            layer 5 depth 1
//!          *               *         layer 4 depth 2
//!      *       *       *       *     layer 3 depth 3
//!    *   *   *   *   *   *   *   *   layer 2 depth 4
//!   * * * * * * * * * * * * * * * *  layer 1 depth 5  leaves
//! ```

use serde::{Deserialize, Serialize};

use crate::canonical::pair_and_hash;
use crate::codec::{Pack, Reader, Writer};
use crate::digest::Digest;
use crate::error::MerkleError;
use crate::validate::validate_frontier;

/// Smallest power of two `>= value`. Returns 0 for 0 and for values above 2^63.
pub const fn next_power_of_2(value: u64) -> u64 {
    let mut value = value.wrapping_sub(1);
    value |= value >> 1;
    value |= value >> 2;
    value |= value >> 4;
    value |= value >> 8;
    value |= value >> 16;
    value |= value >> 32;
    value.wrapping_add(1)
}

/// Largest number of leaves an accumulator can hold
pub const MAX_LEAF_COUNT: u64 = 1 << 63;

/// Depth of the minimal complete binary tree holding `leaf_count` leaves (0 for an empty tree)
pub const fn max_depth(leaf_count: u64) -> u32 {
    if leaf_count == 0 {
        return 0;
    }
    // Above 2^63 the power of two wraps to 0, whose 64 trailing zeros still give log2(2^64)
    next_power_of_2(leaf_count).trailing_zeros() + 1
}

/// Append-only Merkle accumulator over a sequence of leaf digests.
///
/// Every constructor either starts empty or validates the frontier, so a value of this type
/// always satisfies the frontier invariant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FrontierParts")]
pub struct IncrementalMerkle {
    active_nodes: Vec<Digest>,
    leaf_count: u64,
}

#[derive(Deserialize)]
struct FrontierParts {
    active_nodes: Vec<Digest>,
    leaf_count: u64,
}

impl TryFrom<FrontierParts> for IncrementalMerkle {
    type Error = MerkleError;

    fn try_from(parts: FrontierParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts.active_nodes, parts.leaf_count)
    }
}

impl IncrementalMerkle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an accumulator from a persisted frontier, rejecting corrupted state
    pub fn from_parts(active_nodes: Vec<Digest>, leaf_count: u64) -> Result<Self, MerkleError> {
        validate_frontier(&active_nodes, leaf_count)?;
        Ok(Self {
            active_nodes,
            leaf_count,
        })
    }

    /// Decode the packed layout (`active_nodes`, then `leaf_count`) and validate it
    pub fn decode(bytes: &[u8]) -> Result<Self, MerkleError> {
        let mut reader = Reader::new(bytes);
        let active_nodes: Vec<Digest> = reader.read()?;
        let leaf_count = reader.read_u64("leaf_count")?;
        reader.finish("incremental merkle")?;
        Self::from_parts(active_nodes, leaf_count)
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_packed()
    }

    pub fn leaf_count(&self) -> u64 {
        self.leaf_count
    }

    pub fn active_nodes(&self) -> &[Digest] {
        &self.active_nodes
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    /// Current root, or the zero digest for an empty accumulator
    pub fn root(&self) -> Digest {
        if self.leaf_count == 0 {
            return Digest::ZERO;
        }
        self.active_nodes.last().copied().unwrap_or_default()
    }

    /// Re-run the frontier validator against the current state
    pub fn validate(&self) -> Result<(), MerkleError> {
        validate_frontier(&self.active_nodes, self.leaf_count)
    }

    /// Append a leaf and return the new root.
    ///
    /// Fails once the accumulator already holds [`MAX_LEAF_COUNT`] leaves.
    pub fn append(&mut self, leaf: Digest) -> Result<Digest, MerkleError> {
        let leaf_count = self
            .leaf_count
            .checked_add(1)
            .filter(|count| *count <= MAX_LEAF_COUNT)
            .ok_or_else(|| {
                MerkleError::MalformedInput(format!(
                    "accumulator is full at {} leaves",
                    self.leaf_count
                ))
            })?;
        let depth = max_depth(leaf_count);
        let mut index = self.leaf_count;
        let mut top = leaf;
        let mut partial = false;
        let mut previous = self.active_nodes.iter();
        let mut updated = Vec::with_capacity(depth as usize);

        for _ in 1..depth {
            if index & 0x1 == 0 {
                // Left child with an implied right sibling. Only a fully realized node is
                // kept; once partial, nothing above it is realized yet.
                if !partial {
                    updated.push(top);
                }
                top = pair_and_hash(&top, &top);
                partial = true;
            } else {
                // Right child: the left sibling is the next realized node of the old frontier
                let left = *previous
                    .next()
                    .expect("validated frontier holds a left sibling for every set bit");
                if partial {
                    updated.push(left);
                }
                top = pair_and_hash(&left, &top);
            }
            index >>= 1;
        }

        updated.push(top);
        self.active_nodes = updated;
        self.leaf_count = leaf_count;
        Ok(top)
    }

    /// Append every leaf in order and return the final root
    pub fn append_all<I>(&mut self, leaves: I) -> Result<Digest, MerkleError>
    where
        I: IntoIterator<Item = Digest>,
    {
        for leaf in leaves {
            self.append(leaf)?;
        }
        Ok(self.root())
    }

    /// Fully realized frontier node at `layer` (1 = leaves, `max_depth` = root)
    pub fn node_at_layer(&self, layer: u32) -> Result<Digest, MerkleError> {
        if self.leaf_count == 0 {
            return Err(MerkleError::MalformedInput(
                "empty accumulator has no layers".to_string(),
            ));
        }
        let depth = max_depth(self.leaf_count);
        if !(1..=depth).contains(&layer) {
            return Err(MerkleError::MalformedInput(format!(
                "layer {layer} outside 1..={depth}"
            )));
        }
        if layer == depth {
            return Ok(self.root());
        }

        let mut index = self.leaf_count;
        let mut frontier = self.active_nodes.iter();
        for current in 1..depth {
            let node = if index & 0x1 == 1 {
                frontier.next().copied()
            } else {
                None
            };
            if current == layer {
                return node.ok_or_else(|| {
                    MerkleError::MalformedInput(format!(
                        "no fully realized node at layer {layer} for {} leaves",
                        self.leaf_count
                    ))
                });
            }
            index >>= 1;
        }
        Err(MerkleError::MalformedInput(format!(
            "layer {layer} not reached"
        )))
    }
}

impl Pack for IncrementalMerkle {
    fn pack(&self, writer: &mut Writer) {
        writer.write(&self.active_nodes);
        writer.write_u64(self.leaf_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::merkle;
    use crate::canonical::make_canonical_right;
    use crate::path::{verify, MerklePath};

    fn leaf(i: u64) -> Digest {
        Digest::hash(i.to_le_bytes())
    }

    #[test]
    fn test_power_of_two_helpers() {
        assert_eq!(next_power_of_2(0), 0);
        assert_eq!(next_power_of_2(1), 1);
        assert_eq!(next_power_of_2(2), 2);
        assert_eq!(next_power_of_2(3), 4);
        assert_eq!(next_power_of_2(5), 8);
        assert_eq!(next_power_of_2(1 << 40), 1 << 40);
        assert_eq!(next_power_of_2((1 << 40) + 1), 1 << 41);
        assert_eq!(next_power_of_2(1 << 63), 1 << 63);
        assert_eq!(next_power_of_2((1 << 62) + 3), 1 << 63);

        assert_eq!(max_depth(0), 0);
        assert_eq!(max_depth(1), 1);
        assert_eq!(max_depth(2), 2);
        assert_eq!(max_depth(3), 3);
        assert_eq!(max_depth(4), 3);
        assert_eq!(max_depth(5), 4);
        assert_eq!(max_depth(1 << 63), 64);
        assert_eq!(max_depth((1 << 63) + 1), 65);
    }

    #[test]
    fn test_empty_root_is_zero() {
        let mkl = IncrementalMerkle::new();
        assert_eq!(mkl.root(), Digest::ZERO);
        assert_eq!(mkl.leaf_count(), 0);
        assert!(mkl.active_nodes().is_empty());
    }

    #[test]
    fn test_first_append_root_is_leaf() {
        let mut mkl = IncrementalMerkle::new();
        let root = mkl.append(leaf(0)).unwrap();
        assert_eq!(root, leaf(0));
        assert_eq!(mkl.root(), leaf(0));
        assert_eq!(mkl.active_nodes(), &[leaf(0)]);
    }

    #[test]
    fn test_four_leaves_step_by_step() {
        let leaves: Vec<Digest> = (0..4).map(leaf).collect();
        let mut mkl = IncrementalMerkle::new();
        for l in &leaves {
            mkl.append(*l).unwrap();
        }
        assert_eq!(mkl.active_nodes().len(), 1);

        let parent_01 = pair_and_hash(&leaves[0], &leaves[1]);
        let parent_23 = pair_and_hash(&leaves[2], &leaves[3]);

        let path = MerklePath::new(vec![make_canonical_right(&leaves[1])]);
        assert_eq!(path.fold(leaves[0]), parent_01);

        let path = MerklePath::new(vec![
            make_canonical_right(&leaves[1]),
            make_canonical_right(&parent_23),
        ]);
        assert_eq!(path.fold(leaves[0]), mkl.root());
        assert!(verify(&leaves[0], &path, &mkl.root()));
    }

    #[test]
    fn test_five_leaves_frontier_shape() {
        let mut mkl = IncrementalMerkle::new();
        mkl.append_all((0..5).map(leaf)).unwrap();
        assert_eq!(mkl.leaf_count(), 5);
        assert_eq!(max_depth(mkl.leaf_count()), 4);
        assert_eq!(mkl.active_nodes().len(), 3);

        let l = |i| leaf(i);
        let abcd = pair_and_hash(&pair_and_hash(&l(0), &l(1)), &pair_and_hash(&l(2), &l(3)));
        assert_eq!(mkl.active_nodes()[0], l(4));
        assert_eq!(mkl.active_nodes()[1], abcd);
        mkl.validate().unwrap();

        let mut corrupted = mkl.active_nodes().to_vec();
        corrupted[1].0[31] ^= 0xff;
        assert!(matches!(
            IncrementalMerkle::from_parts(corrupted, 5),
            Err(MerkleError::StructuralCorruption(_))
        ));
    }

    #[test]
    fn test_power_of_two_counts_match_batch_merkle() {
        for exp in 0..8 {
            let leaves: Vec<Digest> = (0..(1u64 << exp)).map(leaf).collect();
            let mut mkl = IncrementalMerkle::new();
            mkl.append_all(leaves.iter().copied()).unwrap();
            assert_eq!(mkl.root(), merkle(&leaves), "2^{exp} leaves");
            assert_eq!(mkl.active_nodes().len(), 1);
        }
    }

    #[test]
    fn test_node_at_layer() {
        let mut mkl = IncrementalMerkle::new();
        mkl.append_all((0..5).map(leaf)).unwrap();
        let abcd = mkl.active_nodes()[1];

        assert_eq!(mkl.node_at_layer(1).unwrap(), leaf(4));
        assert!(matches!(
            mkl.node_at_layer(2),
            Err(MerkleError::MalformedInput(_))
        ));
        assert_eq!(mkl.node_at_layer(3).unwrap(), abcd);
        assert_eq!(mkl.node_at_layer(4).unwrap(), mkl.root());
        assert!(mkl.node_at_layer(0).is_err());
        assert!(mkl.node_at_layer(5).is_err());

        assert!(IncrementalMerkle::new().node_at_layer(1).is_err());
    }

    #[test]
    fn test_node_at_layer_is_zero_digest_safe() {
        // A genuinely all-zero leaf must still be reported as present
        let mut mkl = IncrementalMerkle::new();
        mkl.append_all((0..4).map(leaf)).unwrap();
        mkl.append(Digest::ZERO).unwrap();
        assert_eq!(mkl.node_at_layer(1).unwrap(), Digest::ZERO);
        mkl.validate().unwrap();
    }

    #[test]
    fn test_packed_layout() {
        let mut mkl = IncrementalMerkle::new();
        mkl.append_all((0..3).map(leaf)).unwrap();
        let bytes = mkl.encode();

        // varuint32 count, three digests, u64 little-endian count
        assert_eq!(bytes.len(), 1 + 3 * 32 + 8);
        assert_eq!(bytes[0], 3);
        assert_eq!(&bytes[1..33], mkl.active_nodes()[0].as_bytes());
        assert_eq!(&bytes[97..], &3u64.to_le_bytes());

        assert_eq!(IncrementalMerkle::decode(&bytes).unwrap(), mkl);
    }

    #[test]
    fn test_decode_rejects_corruption() {
        let mut mkl = IncrementalMerkle::new();
        mkl.append_all((0..6).map(leaf)).unwrap();
        let bytes = mkl.encode();

        let mut tampered = bytes.clone();
        tampered[10] ^= 0x01;
        assert!(matches!(
            IncrementalMerkle::decode(&tampered),
            Err(MerkleError::StructuralCorruption(_))
        ));

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(matches!(
            IncrementalMerkle::decode(&trailing),
            Err(MerkleError::Decode(_))
        ));

        assert!(matches!(
            IncrementalMerkle::decode(&bytes[..bytes.len() - 1]),
            Err(MerkleError::Decode(_))
        ));
    }

    #[test]
    fn test_serde_validates_on_load() {
        let mut mkl = IncrementalMerkle::new();
        mkl.append_all((0..7).map(leaf)).unwrap();
        let json = serde_json::to_string(&mkl).unwrap();
        assert_eq!(
            serde_json::from_str::<IncrementalMerkle>(&json).unwrap(),
            mkl
        );

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["leaf_count"] = serde_json::json!(8);
        assert!(serde_json::from_value::<IncrementalMerkle>(value).is_err());
    }

    #[test]
    fn test_decode_rejects_count_beyond_capacity() {
        let nodes: Vec<Digest> = (0..65).map(leaf).collect();
        let mut writer = Writer::new();
        writer.write(&nodes);
        writer.write_u64(u64::MAX);
        assert!(matches!(
            IncrementalMerkle::decode(&writer.into_bytes()),
            Err(MerkleError::StructuralCorruption(_))
        ));

        let nodes: Vec<Digest> = (0..3).map(leaf).collect();
        assert!(matches!(
            IncrementalMerkle::from_parts(nodes, MAX_LEAF_COUNT + 1),
            Err(MerkleError::StructuralCorruption(_))
        ));
    }

    #[test]
    fn test_full_accumulator_refuses_append() {
        let mut mkl = IncrementalMerkle::from_parts(vec![leaf(0)], MAX_LEAF_COUNT).unwrap();
        assert_eq!(max_depth(MAX_LEAF_COUNT), 64);
        assert!(matches!(
            mkl.append(leaf(1)),
            Err(MerkleError::MalformedInput(_))
        ));
        assert_eq!(mkl.leaf_count(), MAX_LEAF_COUNT);
        assert_eq!(mkl.active_nodes(), &[leaf(0)]);
    }
}
