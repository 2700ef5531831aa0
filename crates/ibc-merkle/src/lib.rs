//! Merkle primitives shared by the IBC light client
//!
//! This crate provides the 256-bit digest type, the deterministic pack codec used for
//! on-chain byte layouts, canonical left/right pairing, the incremental Merkle accumulator
//! (with its frontier validator), Merkle path verification and proving, and the batch
//! Merkle reduction.

pub mod batch;
pub mod canonical;
pub mod codec;
pub mod digest;
pub mod error;
pub mod incremental;
pub mod path;
pub mod validate;

pub use batch::merkle;
pub use canonical::{
    is_canonical_left, is_canonical_right, make_canonical_left, make_canonical_pair,
    make_canonical_right, pair_and_hash,
};
pub use digest::{Digest, DIGEST_SIZE};
pub use error::MerkleError;
pub use incremental::{max_depth, next_power_of_2, IncrementalMerkle, MAX_LEAF_COUNT};
pub use path::{verify, verify_or_err, MerklePath, MerkleTree};
pub use validate::{expected_frontier_len, validate_frontier};
