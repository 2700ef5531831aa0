//! Merkle inclusion paths: verification and proving.
//!
//! A path lists sibling digests from the leaf up to the root. Each entry carries its own
//! role in the top bit (see [`crate::canonical`]), so no index array travels with it.

use serde::{Deserialize, Serialize};

use crate::canonical::{is_canonical_left, make_canonical_left, make_canonical_right, pair_and_hash};
use crate::codec::{DecodeError, Pack, Reader, Unpack, Writer};
use crate::digest::Digest;
use crate::error::MerkleError;

/// Longest path a tree over at most 2^64 leaves can produce
pub const MAX_PATH_LEN: usize = 64;

/// Ordered list of role-tagged sibling digests, leaf to root
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MerklePath(Vec<Digest>);

impl MerklePath {
    pub fn new(entries: Vec<Digest>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[Digest] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, entry: Digest) {
        self.0.push(entry);
    }

    pub fn into_inner(self) -> Vec<Digest> {
        self.0
    }

    /// Fold the path onto `leaf`, returning the root it commits to
    pub fn fold(&self, leaf: Digest) -> Digest {
        self.0.iter().fold(leaf, |acc, entry| {
            if is_canonical_left(entry) {
                pair_and_hash(entry, &acc)
            } else {
                pair_and_hash(&acc, entry)
            }
        })
    }
}

impl FromIterator<Digest> for MerklePath {
    fn from_iter<I: IntoIterator<Item = Digest>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Pack for MerklePath {
    fn pack(&self, writer: &mut Writer) {
        writer.write(&self.0);
    }
}

impl Unpack for MerklePath {
    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self(reader.read()?))
    }
}

/// Check that `path` folds `leaf` to exactly `expected_root`.
///
/// Paths longer than [`MAX_PATH_LEN`] never verify.
pub fn verify(leaf: &Digest, path: &MerklePath, expected_root: &Digest) -> bool {
    verify_or_err(leaf, path, expected_root).is_ok()
}

/// Same as [`verify`] but reports why the path was rejected
pub fn verify_or_err(
    leaf: &Digest,
    path: &MerklePath,
    expected_root: &Digest,
) -> Result<(), MerkleError> {
    if path.len() > MAX_PATH_LEN {
        return Err(MerkleError::MalformedInput(format!(
            "path of {} entries exceeds {MAX_PATH_LEN}",
            path.len()
        )));
    }
    let computed = path.fold(*leaf);
    if computed != *expected_root {
        return Err(MerkleError::VerificationFailure(format!(
            "path folds to {computed}, expected root {expected_root}"
        )));
    }
    Ok(())
}

/// Fully materialized tree over a known leaf list, used to produce inclusion paths.
///
/// Layers are built like [`crate::batch::merkle`]: an odd trailing node is paired with
/// itself.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    layers: Vec<Vec<Digest>>,
}

impl MerkleTree {
    pub fn new(leaves: Vec<Digest>) -> Self {
        let mut layers = vec![leaves];
        while let Some(layer) = layers.last().filter(|layer| layer.len() > 1) {
            let parents = layer
                .chunks(2)
                .map(|chunk| match chunk {
                    [left, right] => pair_and_hash(left, right),
                    [left] => pair_and_hash(left, left),
                    _ => unreachable!("Chunk size is at most 2"),
                })
                .collect();
            layers.push(parents);
        }
        Self { layers }
    }

    pub fn leaf_count(&self) -> usize {
        self.layers[0].len()
    }

    pub fn leaves(&self) -> &[Digest] {
        &self.layers[0]
    }

    /// Root of the tree, the zero digest when there are no leaves
    pub fn root(&self) -> Digest {
        self.layers
            .last()
            .and_then(|layer| layer.first())
            .copied()
            .unwrap_or_default()
    }

    /// Inclusion path for the leaf at `index`
    pub fn proof(&self, index: usize) -> Result<MerklePath, MerkleError> {
        if index >= self.leaf_count() {
            return Err(MerkleError::MalformedInput(format!(
                "leaf index {index} out of range for {} leaves",
                self.leaf_count()
            )));
        }

        let mut path = MerklePath::default();
        let mut index = index;
        for layer in &self.layers[..self.layers.len() - 1] {
            if index % 2 == 1 {
                path.push(make_canonical_left(&layer[index - 1]));
            } else {
                // Missing right sibling: the node is paired with itself
                let sibling = layer.get(index + 1).unwrap_or(&layer[index]);
                path.push(make_canonical_right(sibling));
            }
            index /= 2;
        }
        Ok(path)
    }
}
